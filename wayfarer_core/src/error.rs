use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum GuidanceError {
    #[error("no position available yet")]
    PositionUnavailable,

    #[error("the guidance scheduler is not running")]
    SchedulerStopped,
}
