mod answers;
mod ids;
mod quiz;
mod result;

pub use ids::{LevelId, ParseIdError, QuestionId, QuizId, SubjectId};

pub use answers::AnswerSet;
pub use quiz::{DEFAULT_TIME_LIMIT_SECS, Question, Quiz, QuizError, QuizSource, Resource};
pub use result::{
    PASS_THRESHOLD, QuestionOutcome, QuestionReview, QuizResult, QuizResultError,
};
