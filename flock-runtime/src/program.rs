//! Scenario programs the runtime assembles from a simulation config.
use flock_core::{
    start_offset, DataChannelSpec, ScenarioError, ScenarioProgram, SessionConfig,
    SimulationConfig, DEFAULT_IDLE_SLEEP_MS,
};
use std::time::Duration;

/// Name of the background sender for a data-channel label.
pub fn data_channel_scenario_name(label: &str) -> String {
    format!("scenario-dcs-{label}")
}

/// `[Sleep(interval), SendMessage(label, min, max)]`, looping from the start.
pub fn data_channel_scenario(spec: &DataChannelSpec) -> Result<ScenarioProgram, ScenarioError> {
    ScenarioProgram::builder()
        .sleep(spec.interval)
        .send_message(&spec.label, spec.size_min, spec.size_max)
        .build(0)
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// The program every client runs, before its hatch offset.
///
/// Connects once, starts a sender for every sending data channel and then either stays
/// connected, disconnects and exits after `duration`, or keeps cycling through
/// `duration` connected and `repeat_interval` disconnected.
pub fn client_program(
    session: &SessionConfig,
    simulation: &SimulationConfig,
) -> Result<ScenarioProgram, ScenarioError> {
    let mut builder = ScenarioProgram::builder().reconnect();
    for spec in session.data_channels.iter().filter(|c| c.is_sender()) {
        builder = builder.play_sub_scenario(
            &data_channel_scenario_name(&spec.label),
            data_channel_scenario(spec)?,
        );
    }

    let loop_index = builder.len();
    let builder = match (simulation.duration, simulation.repeat_interval) {
        (None, _) => builder.sleep(DEFAULT_IDLE_SLEEP_MS),
        (Some(duration), None) => builder.sleep(millis(duration)).disconnect().exit(),
        (Some(duration), Some(repeat)) => builder
            .sleep(millis(duration))
            .disconnect()
            .sleep(millis(repeat))
            .reconnect(),
    };
    builder.build(loop_index)
}

/// [`client_program`] delayed by the client's place in the hatch order.
pub fn hatched_program(program: &ScenarioProgram, index: usize, hatch_rate: f64) -> ScenarioProgram {
    program.with_start_offset(start_offset(index, hatch_rate))
}
