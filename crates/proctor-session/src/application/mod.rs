//! Application layer: the session controller and the activities it drives

pub mod clock;
pub mod gateway;
mod guard;
pub mod monitor;
pub mod service;

pub use clock::{ClockHandlers, CountdownClock, ExpireHandler, TickHandler};
pub use gateway::SubmissionGateway;
pub use monitor::{
    EscalationHandler, IntegrityMonitor, MonitorHandlers, MonitorSettings, ViolationHandler,
};
pub use service::{SessionController, SessionPorts};
