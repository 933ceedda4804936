use eyre::{Report, WrapErr};
use log::{info, warn};
use rh56::{joint_targets, BusError, DeviceId, HandBus, Register, JOINT_COUNT};
use serde_derive::Deserialize;
use std::thread::sleep;
use std::time::Duration;

/// One thing to do to the hand.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case", deny_unknown_fields)]
pub enum Step {
    /// Sets a per-joint register. A value of -1 leaves that joint unchanged.
    Write { register: String, values: Vec<i32> },
    Read { register: String },
    SelectAction { index: u8 },
    RunAction,
    ClearErrors,
    Wait { ms: u64 },
}

/// Sets speed and force, closes and opens the hand, reports its state, then plays action
/// sequence 3.
pub fn demo() -> Vec<Step> {
    let set = |register: Register, value| Step::Write {
        register: register.to_string(),
        values: vec![value; JOINT_COUNT],
    };
    let second = Step::Wait { ms: 1000 };
    vec![
        set(Register::SpeedSet, 1000),
        second.clone(),
        set(Register::ForceSet, 500),
        second.clone(),
        set(Register::AngleSet, 0),
        second.clone(),
        set(Register::AngleSet, 1000),
        second.clone(),
        Step::Read {
            register: Register::Temperature.to_string(),
        },
        Step::Read {
            register: Register::AngleActual.to_string(),
        },
        Step::SelectAction { index: 3 },
        second,
        Step::RunAction,
    ]
}

/// Runs the steps in order, stopping at the first failure. Reads which get no reply are only
/// logged.
pub fn run(bus: &mut dyn HandBus, device: DeviceId, steps: &[Step]) -> Result<(), Report> {
    for step in steps {
        run_step(bus, device, step).wrap_err_with(|| format!("Running {:?}", step))?;
    }
    Ok(())
}

fn run_step(bus: &mut dyn HandBus, device: DeviceId, step: &Step) -> Result<(), Report> {
    match step {
        Step::Write { register, values } => {
            let register = parse_register(register)?;
            let targets = joint_targets(values)?;
            match bus.update_joint_register(device, register, &targets) {
                Ok(written) => info!("{} <- {:?}", register, written),
                // Only happens when unset joints needed their current setpoints.
                Err(e) if e.is_no_data() => {
                    warn!("{} not written, couldn't read current setpoints: {}", register, e)
                }
                Err(e) => return Err(e.into()),
            }
        }
        Step::Read { register } => {
            let register = parse_register(register)?;
            if let Some(reading) = no_data_as_none(read(bus, device, register), register)? {
                info!("{}: {}", register, reading);
            }
        }
        Step::SelectAction { index } => {
            info!("Selecting action sequence {}", index);
            bus.select_action_sequence(device, *index)?;
        }
        Step::RunAction => {
            info!("Running action sequence");
            bus.run_action_sequence(device)?;
        }
        Step::ClearErrors => {
            info!("Clearing errors");
            bus.clear_errors(device)?;
        }
        Step::Wait { ms } => sleep(Duration::from_millis(*ms)),
    }
    Ok(())
}

fn parse_register(name: &str) -> Result<Register, Report> {
    name.parse()
        .wrap_err_with(|| format!("Unknown register {:?}", name))
}

fn read(bus: &mut dyn HandBus, device: DeviceId, register: Register) -> Result<String, BusError> {
    Ok(match register {
        Register::ErrorCode => format!("{:?}", bus.read_actuator_errors(device)?),
        _ if register.is_diagnostic() => format!("{:?}", bus.read_diagnostic(device, register)?),
        _ => format!("{:?}", bus.read_joint_register(device, register)?),
    })
}

fn no_data_as_none<T>(
    result: Result<T, BusError>,
    register: Register,
) -> Result<Option<T>, BusError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_no_data() => {
            warn!("No data for {}: {}", register, e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
