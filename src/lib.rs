//! Aisle - schema-typed LLM flows for product support

pub mod config;
pub mod dispatch;
pub mod error;
pub mod event_log;
pub mod flow;
pub mod provider;
pub mod schema;
pub mod template;

pub use config::AisleConfig;
pub use dispatch::DispatchSlot;
pub use error::{AisleError, FixSuggestion};
pub use event_log::{Event, EventKind, EventLog};
pub use flow::{
    answer_question, assess_popularity, check_availability, AnswerQuestionInput,
    AnswerQuestionOutput, AssessPopularityInput, AssessPopularityOutput, CheckAvailabilityInput,
    CheckAvailabilityOutput, FlowDef, FlowRunner, ANSWER_QUESTION, ASSESS_POPULARITY,
    CHECK_AVAILABILITY,
};
pub use schema::{FieldSpec, FieldType, Schema, Violation, ViolationKind};
pub use template::PromptTemplate;
