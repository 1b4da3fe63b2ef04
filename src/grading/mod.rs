pub mod corrector;
pub mod rubric;

pub use corrector::{CompetencyScore, CorrectionReport, EssayCorrector, GradingError};
pub use rubric::ExamFormat;
