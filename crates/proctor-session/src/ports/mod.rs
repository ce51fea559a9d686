//! Ports module for the proctored session

pub mod inbound;
pub mod outbound;

pub use inbound::ProctoredSessionApi;
pub use outbound::{
    CaptureSource, CaptureStep, ClassificationService, ClassifyStep, GradeStep, GradingService,
    MockGradingService, MockQuestionSource, QuestionSource, ScriptedCapture, ScriptedClassifier,
};
