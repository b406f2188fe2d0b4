//! Scripted client behaviour.
//!
//! A [`ScenarioProgram`] is an ordered list of [`Operation`]s plus a loop index. Once the
//! cursor runs past the last operation it wraps back to the loop index rather than to 0,
//! so a program can have a one-shot prologue followed by a repeating body.
use crate::{ScenarioError, DEFAULT_IDLE_SLEEP_MS};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Wait a uniformly sampled number of milliseconds in `[min_ms, max_ms]`.
    Sleep { min_ms: u64, max_ms: u64 },
    /// Send a payload of a uniformly sampled size on a data-channel label.
    SendMessage {
        label: String,
        min_size: usize,
        max_size: usize,
    },
    Disconnect,
    Reconnect,
    /// Start (or restart) a named program on its own cursor for the same client.
    PlaySubScenario {
        name: String,
        program: Box<ScenarioProgram>,
    },
    /// Disconnect and stop every cursor of this client.
    Exit,
}

impl Operation {
    pub fn sleep(ms: u64) -> Self {
        Operation::Sleep {
            min_ms: ms,
            max_ms: ms,
        }
    }

    fn validate(&self) -> Result<(), ScenarioError> {
        match self {
            Operation::Sleep { min_ms, max_ms } if min_ms > max_ms => {
                Err(ScenarioError::SleepRange {
                    min_ms: *min_ms,
                    max_ms: *max_ms,
                })
            }
            Operation::SendMessage {
                label,
                min_size,
                max_size,
            } if min_size > max_size => Err(ScenarioError::SizeRange {
                label: label.clone(),
                min: *min_size,
                max: *max_size,
            }),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawProgram", into = "RawProgram")]
pub struct ScenarioProgram {
    ops: Vec<Operation>,
    loop_index: usize,
}

#[derive(Serialize, Deserialize)]
struct RawProgram {
    ops: Vec<Operation>,
    #[serde(default)]
    loop_index: usize,
}

impl TryFrom<RawProgram> for ScenarioProgram {
    type Error = ScenarioError;

    fn try_from(raw: RawProgram) -> Result<Self, Self::Error> {
        ScenarioProgram::new(raw.ops, raw.loop_index)
    }
}

impl From<ScenarioProgram> for RawProgram {
    fn from(program: ScenarioProgram) -> Self {
        RawProgram {
            ops: program.ops,
            loop_index: program.loop_index,
        }
    }
}

impl ScenarioProgram {
    pub fn new(ops: Vec<Operation>, loop_index: usize) -> Result<Self, ScenarioError> {
        if ops.is_empty() {
            return Err(ScenarioError::Empty);
        }
        if loop_index >= ops.len() {
            return Err(ScenarioError::LoopIndex {
                index: loop_index,
                len: ops.len(),
            });
        }
        for op in &ops {
            op.validate()?;
        }
        Ok(Self { ops, loop_index })
    }

    pub fn builder() -> ScenarioBuilder {
        ScenarioBuilder::default()
    }

    pub fn ops(&self) -> &[Operation] {
        &self.ops
    }

    pub fn get(&self, index: usize) -> Option<&Operation> {
        self.ops.get(index)
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn loop_index(&self) -> usize {
        self.loop_index
    }

    /// Index of the operation after `index`, wrapping to the loop index at the end.
    pub fn next_index(&self, index: usize) -> usize {
        let next = index + 1;
        if next >= self.ops.len() {
            self.loop_index
        } else {
            next
        }
    }

    /// Prefix the program with a fixed sleep, shifting the loop index past it.
    pub fn with_start_offset(&self, offset: Duration) -> ScenarioProgram {
        let ms = u64::try_from(offset.as_millis()).unwrap_or(u64::MAX);
        let mut ops = Vec::with_capacity(self.ops.len() + 1);
        ops.push(Operation::sleep(ms));
        ops.extend(self.ops.iter().cloned());
        ScenarioProgram {
            ops,
            loop_index: self.loop_index + 1,
        }
    }
}

/// Start offset of the client at `client_index` for a given hatch rate (clients per second).
pub fn start_offset(client_index: usize, hatch_rate: f64) -> Duration {
    let ms = 1000.0 * client_index as f64 / hatch_rate;
    if ms.is_finite() && ms > 0.0 {
        Duration::from_millis(ms as u64)
    } else {
        Duration::ZERO
    }
}

#[derive(Debug, Default, Clone)]
pub struct ScenarioBuilder {
    ops: Vec<Operation>,
}

impl ScenarioBuilder {
    pub fn sleep(self, ms: u64) -> Self {
        self.op(Operation::sleep(ms))
    }

    pub fn sleep_range(self, min_ms: u64, max_ms: u64) -> Self {
        self.op(Operation::Sleep { min_ms, max_ms })
    }

    pub fn send_message(self, label: &str, min_size: usize, max_size: usize) -> Self {
        self.op(Operation::SendMessage {
            label: label.to_string(),
            min_size,
            max_size,
        })
    }

    pub fn disconnect(self) -> Self {
        self.op(Operation::Disconnect)
    }

    pub fn reconnect(self) -> Self {
        self.op(Operation::Reconnect)
    }

    pub fn play_sub_scenario(self, name: &str, program: ScenarioProgram) -> Self {
        self.op(Operation::PlaySubScenario {
            name: name.to_string(),
            program: Box::new(program),
        })
    }

    pub fn exit(self) -> Self {
        self.op(Operation::Exit)
    }

    pub fn op(mut self, op: Operation) -> Self {
        self.ops.push(op);
        self
    }

    /// Number of operations added so far. Handy for computing loop indices.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn build(self, loop_index: usize) -> Result<ScenarioProgram, ScenarioError> {
        ScenarioProgram::new(self.ops, loop_index)
    }
}

/// `[Reconnect, Sleep(10s)]` looping on the sleep: connect once and stay.
pub fn idle_program() -> ScenarioProgram {
    ScenarioProgram {
        ops: vec![Operation::Reconnect, Operation::sleep(DEFAULT_IDLE_SLEEP_MS)],
        loop_index: 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_invalid_programs() {
        assert_eq!(ScenarioProgram::new(vec![], 0), Err(ScenarioError::Empty));
        assert_eq!(
            ScenarioProgram::new(vec![Operation::Reconnect], 1),
            Err(ScenarioError::LoopIndex { index: 1, len: 1 })
        );
        assert!(matches!(
            ScenarioProgram::builder().sleep_range(10, 5).build(0),
            Err(ScenarioError::SleepRange { .. })
        ));
    }

    #[test]
    fn next_index_wraps_to_loop_index() {
        let program = ScenarioProgram::builder()
            .reconnect()
            .sleep(100)
            .disconnect()
            .build(1)
            .unwrap();
        assert_eq!(program.next_index(0), 1);
        assert_eq!(program.next_index(1), 2);
        assert_eq!(program.next_index(2), 1);
    }

    #[test]
    fn start_offsets_follow_hatch_rate() {
        let offsets: Vec<_> = (0..3).map(|i| start_offset(i, 1.0)).collect();
        assert_eq!(
            offsets,
            vec![
                Duration::ZERO,
                Duration::from_millis(1000),
                Duration::from_millis(2000)
            ]
        );
        assert_eq!(start_offset(3, 2.0), Duration::from_millis(1500));
    }

    #[test]
    fn start_offset_prefix_shifts_loop() {
        let program = idle_program().with_start_offset(Duration::from_millis(2000));
        assert_eq!(program.len(), 3);
        assert_eq!(program.loop_index(), 2);
        assert_eq!(program.get(0), Some(&Operation::sleep(2000)));
        assert_eq!(program.get(1), Some(&Operation::Reconnect));
    }

    #[test]
    fn deserialization_validates() {
        let program: ScenarioProgram = serde_json::from_value(json!({
            "ops": [
                {"op": "reconnect"},
                {"op": "sleep", "min_ms": 100, "max_ms": 200},
                {"op": "send_message", "label": "#spam", "min_size": 48, "max_size": 64},
            ],
            "loop_index": 1,
        }))
        .unwrap();
        assert_eq!(program.len(), 3);

        let invalid = serde_json::from_value::<ScenarioProgram>(json!({
            "ops": [{"op": "disconnect"}],
            "loop_index": 4,
        }));
        assert!(invalid.is_err());
    }
}
