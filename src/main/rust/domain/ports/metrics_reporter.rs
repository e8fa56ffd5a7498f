use crate::domain::value_objects::CoordinatorState;

/// Port for metrics reporting
pub trait MetricsReporter: Send + Sync {
    fn report_client_connected(&self);
    fn report_client_disconnected(&self);
    fn report_bytes_sent(&self, bytes: u64);
    fn report_fanout_drop(&self);
    fn report_state_change(&self, state: &CoordinatorState);
}
