//! Integration tests for the Bme68xService control/measurement pipeline.
//!
//! Time is driven explicitly: each test calls `poll` at chosen instants and
//! inspects the pending timer, the mock call history and emitted events.

use bme68x_bsec::adapters::blob_store::MemBlobStore;
use bme68x_bsec::app::commands::AppCommand;
use bme68x_bsec::app::events::CalibrationStatus;
use bme68x_bsec::app::service::Bme68xService;
use bme68x_bsec::bsec::{ChannelGroup, InputSensor, OutputSensor, SampleRate};
use bme68x_bsec::calibration::Calibration;
use bme68x_bsec::config::BsecConfig;
use bme68x_bsec::error::{ConfigError, DriverError, EngineError, Error, IoError};
use bme68x_bsec::measurement::MeasurementCycle;
use bme68x_bsec::scheduler::{FALLBACK_DELAY_MS, Timer};
use bme68x_bsec::sensors::{HeaterConfig, OpMode, SensorSettings};

use crate::mock_hw::{
    FakeSensor, NS_PER_MS, RecordingSink, ScriptedEngine, SensorCall, output,
};

type Service = Bme68xService<FakeSensor, ScriptedEngine, MemBlobStore>;

fn service_with(sensor: FakeSensor, engine: ScriptedEngine, config: BsecConfig) -> Service {
    Bme68xService::new(sensor, engine, MemBlobStore::new(), config)
}

fn started(sensor: FakeSensor, engine: ScriptedEngine) -> Service {
    let mut svc = service_with(sensor, engine, BsecConfig::default());
    svc.init(0).unwrap();
    svc
}

/// Poll at each successive deadline until `n` outputs have been emitted.
fn run_cycles(svc: &mut Service, sink: &mut RecordingSink, n: usize) {
    for _ in 0..(n * 4 + 4) {
        if sink.outputs().len() >= n {
            return;
        }
        let due = svc.next_deadline().expect("loop stopped");
        svc.poll(due, sink);
    }
    panic!("only {} of {n} cycles completed", sink.outputs().len());
}

// ── Init ──────────────────────────────────────────────────────

#[test]
fn init_subscribes_groups_and_starts() {
    let mut svc = service_with(
        FakeSensor::new(),
        ScriptedEngine::periodic(3000),
        BsecConfig::default(),
    );
    let v = svc.init(0).unwrap();
    assert_eq!(v.to_string(), "1.4.9.2");
    assert!(svc.is_running());
    assert_eq!(svc.next_deadline(), Some(0));

    let engine = svc.engine();
    assert_eq!(engine.last_rate(OutputSensor::Iaq), Some(SampleRate::LowPower.hz()));
    assert_eq!(engine.last_rate(OutputSensor::RawGas), Some(SampleRate::LowPower.hz()));
    assert_eq!(
        engine.last_rate(OutputSensor::HeatCompensatedTemperature),
        Some(SampleRate::Disabled.hz())
    );
    assert_eq!(engine.last_rate(OutputSensor::RawPressure), Some(SampleRate::Disabled.hz()));
    assert_eq!(svc.calibration().prev_iaq_rate(), SampleRate::LowPower);
}

#[test]
fn init_with_every_group_disabled_stays_idle() {
    let config = BsecConfig {
        iaq_sample_rate: String::new(),
        ..BsecConfig::default()
    };
    let mut svc = service_with(FakeSensor::new(), ScriptedEngine::periodic(3000), config);
    svc.init(0).unwrap();
    assert!(!svc.is_running());
    assert_eq!(svc.next_deadline(), None);
}

#[test]
fn engine_init_failure_is_fatal() {
    let mut engine = ScriptedEngine::periodic(3000);
    engine.fail_init = Some(-2);
    let mut svc = service_with(FakeSensor::new(), engine, BsecConfig::default());
    assert_eq!(svc.init(0), Err(Error::Engine(EngineError(-2))));
    assert!(!svc.is_running());
}

#[test]
fn subscription_failure_is_fatal() {
    let mut engine = ScriptedEngine::periodic(3000);
    engine.fail_subscription = Some(-6);
    let mut svc = service_with(FakeSensor::new(), engine, BsecConfig::default());
    assert_eq!(svc.init(0), Err(Error::Engine(EngineError(-6))));
    assert!(!svc.is_running());
}

#[test]
fn blobs_loaded_at_init_and_failures_only_warn() {
    let config = BsecConfig {
        config_file: "bsec.config".into(),
        state_file: "bsec_state.bin".into(),
        ..BsecConfig::default()
    };
    let store = MemBlobStore::new()
        .with("bsec.config", &[0x10, 0x00, 0x00, 0x00, 7, 8, 9])
        .with("bsec_state.bin", &[1, 2, 3]);
    let mut svc = Bme68xService::new(FakeSensor::new(), ScriptedEngine::periodic(3000), store, config.clone());
    svc.init(0).unwrap();
    assert_eq!(svc.engine().config.as_deref(), Some(&[7u8, 8, 9][..]));
    assert_eq!(svc.engine().loaded_state.as_deref(), Some(&[1u8, 2, 3][..]));

    // Nothing stored: init still succeeds.
    let mut svc = service_with(FakeSensor::new(), ScriptedEngine::periodic(3000), config);
    svc.init(0).unwrap();
    assert!(svc.is_running());
    assert_eq!(svc.engine().config, None);
}

#[test]
fn rejected_state_blob_only_warns() {
    let mut engine = ScriptedEngine::periodic(3000);
    engine.fail_set_state = Some(-32);
    let store = MemBlobStore::new().with("bsec_state.bin", &[1, 2, 3]);
    let mut svc = Bme68xService::new(FakeSensor::new(), engine, store, BsecConfig::default());
    svc.init(0).unwrap();
    assert!(svc.is_running());
}

// ── Triggered cycle ───────────────────────────────────────────

#[test]
fn triggered_cycle_measures_after_heater_duration() {
    let mut sensor = FakeSensor::new();
    sensor.heater_ms = 196;
    let mut svc = started(sensor, ScriptedEngine::periodic(3000));
    let mut sink = RecordingSink::new();

    assert!(svc.poll(0, &mut sink));
    assert_eq!(
        svc.sensor().calls,
        vec![
            SensorCall::SetOpMode(OpMode::Forced),
            SensorCall::Apply(SensorSettings {
                os_hum: 1,
                os_temp: 2,
                os_pres: 1,
                filter: 0,
                heater: HeaterConfig {
                    enable: true,
                    temperature_c: 320,
                    duration_ms: 197,
                },
            }),
            SensorCall::SetOpMode(OpMode::Forced),
            SensorCall::HeaterDuration,
        ]
    );
    match svc.control().pending() {
        Some(Timer::Measurement {
            due_ms,
            settings,
            control_due_ms,
        }) => {
            assert_eq!(*due_ms, 196);
            assert_eq!(*control_due_ms, 3000);
            assert_eq!(settings.next_call, 0);
        }
        other => panic!("expected measurement timer, got {other:?}"),
    }
    assert_eq!(svc.control().next_ts(), 3000 * NS_PER_MS);

    assert!(!svc.poll(195, &mut sink));
    assert!(sink.events.is_empty());

    assert!(svc.poll(196, &mut sink));
    assert_eq!(sink.outputs().len(), 1);
    assert_eq!(svc.next_deadline(), Some(3000));

    let inputs = &svc.engine().step_inputs[0];
    let ids: Vec<_> = inputs.iter().map(|i| i.sensor).collect();
    assert_eq!(
        ids,
        vec![
            InputSensor::Pressure,
            InputSensor::Temperature,
            InputSensor::HeatSource,
            InputSensor::Humidity,
            InputSensor::GasResistor,
        ]
    );
    assert!(inputs.iter().all(|i| i.time_stamp == 0));

    assert!(svc.poll(3000, &mut sink));
    assert_eq!(svc.engine().control_calls, vec![0, 3000 * NS_PER_MS]);
}

#[test]
fn exactly_one_event_per_measurement() {
    let mut svc = started(FakeSensor::new(), ScriptedEngine::periodic(3000));
    let mut sink = RecordingSink::new();
    run_cycles(&mut svc, &mut sink, 3);
    assert_eq!(sink.events.len(), 3);
    assert_eq!(svc.engine().step_inputs.len(), 3);
}

#[test]
fn late_measurement_rearms_control_immediately() {
    let mut svc = started(FakeSensor::new(), ScriptedEngine::periodic(3000));
    let mut sink = RecordingSink::new();
    svc.poll(0, &mut sink);
    svc.poll(5000, &mut sink);
    assert_eq!(sink.outputs().len(), 1);
    assert_eq!(svc.next_deadline(), Some(5000));
}

#[test]
fn measurement_waits_for_sleep() {
    let mut sensor = FakeSensor::new();
    sensor.busy_polls = 3;
    let mut svc = started(sensor, ScriptedEngine::periodic(3000));
    let mut sink = RecordingSink::new();
    run_cycles(&mut svc, &mut sink, 1);
    assert_eq!(svc.sensor().count(|c| *c == SensorCall::OpMode), 4);
}

#[test]
fn sensor_stuck_measuring_skips_cycle() {
    let mut sensor = FakeSensor::new();
    sensor.never_sleeps = true;
    let mut svc = Bme68xService::new(sensor, ScriptedEngine::periodic(3000), MemBlobStore::new(), BsecConfig::default())
        .with_measurement(MeasurementCycle::new(Calibration::new(false)).with_max_polls(5));
    svc.init(0).unwrap();
    let mut sink = RecordingSink::new();

    svc.poll(0, &mut sink);
    svc.poll(100, &mut sink);
    assert!(sink.events.is_empty());
    assert_eq!(svc.sensor().count(|c| *c == SensorCall::OpMode), 5);
    assert_eq!(svc.sensor().count(|c| matches!(c, SensorCall::GetData(_))), 0);
    assert_eq!(svc.next_deadline(), Some(3000));
}

// ── Inline cycle ──────────────────────────────────────────────

#[test]
fn processing_without_trigger_runs_inline() {
    let mut engine = ScriptedEngine::periodic(3000);
    engine.template.trigger_measurement = false;
    let mut svc = started(FakeSensor::new(), engine);
    let mut sink = RecordingSink::new();

    svc.poll(0, &mut sink);
    assert_eq!(sink.outputs().len(), 1);
    assert_eq!(svc.sensor().calls, vec![SensorCall::GetData(OpMode::Forced)]);
    assert_eq!(svc.control().pending(), Some(&Timer::Control { due_ms: 3000 }));
}

#[test]
fn nothing_requested_emits_nothing() {
    let mut engine = ScriptedEngine::periodic(3000);
    engine.template.trigger_measurement = false;
    engine.template.process_data.0 = 0;
    let mut svc = started(FakeSensor::new(), engine);
    let mut sink = RecordingSink::new();

    svc.poll(0, &mut sink);
    svc.poll(3000, &mut sink);
    assert!(sink.events.is_empty());
    assert!(svc.sensor().calls.is_empty());
    assert!(svc.engine().step_inputs.is_empty());
    assert_eq!(svc.next_deadline(), Some(6000));
}

#[test]
fn reading_without_new_data_still_runs_engine() {
    let mut sensor = FakeSensor::new();
    sensor.data.status = 0;
    let mut svc = started(sensor, ScriptedEngine::periodic(3000));
    let mut sink = RecordingSink::new();
    run_cycles(&mut svc, &mut sink, 1);
    assert!(svc.engine().step_inputs[0].is_empty());
}

#[test]
fn invalid_gas_is_not_fed() {
    let mut sensor = FakeSensor::new();
    sensor.data.status = 0x80;
    let mut svc = started(sensor, ScriptedEngine::periodic(3000));
    let mut sink = RecordingSink::new();
    run_cycles(&mut svc, &mut sink, 1);
    let inputs = &svc.engine().step_inputs[0];
    assert_eq!(inputs.len(), 4);
    assert!(inputs.iter().all(|i| i.sensor != InputSensor::GasResistor));
}

// ── Failures ──────────────────────────────────────────────────

#[test]
fn engine_control_failure_retries_after_fallback() {
    let mut engine = ScriptedEngine::periodic(3000);
    engine.script.push_back(Err(EngineError(-10)));
    let mut svc = started(FakeSensor::new(), engine);
    let mut sink = RecordingSink::new();

    svc.poll(0, &mut sink);
    assert_eq!(
        svc.control().pending(),
        Some(&Timer::Control {
            due_ms: FALLBACK_DELAY_MS
        })
    );
    assert!(svc.sensor().calls.is_empty());

    svc.poll(FALLBACK_DELAY_MS, &mut sink);
    assert_eq!(svc.engine().control_calls, vec![0, 0]);
}

#[test]
fn sensor_setup_failure_uses_fallback() {
    let cases: [(Box<dyn Fn(&mut FakeSensor)>, usize); 4] = [
        (Box::new(|s: &mut FakeSensor| s.fail_set_op_mode_at = Some(0)), 1),
        (Box::new(|s: &mut FakeSensor| s.fail_apply = Some(DriverError::InvalidLength)), 2),
        (Box::new(|s: &mut FakeSensor| s.fail_set_op_mode_at = Some(1)), 3),
        (Box::new(|s: &mut FakeSensor| s.fail_heater_read = Some(DriverError::Comm(IoError::Bus))), 4),
    ];
    for (arm, calls) in cases {
        let mut sensor = FakeSensor::new();
        arm(&mut sensor);
        let mut svc = started(sensor, ScriptedEngine::periodic(3000));
        let mut sink = RecordingSink::new();

        svc.poll(0, &mut sink);
        assert_eq!(svc.sensor().calls.len(), calls);
        assert_eq!(
            svc.control().pending(),
            Some(&Timer::Control {
                due_ms: FALLBACK_DELAY_MS
            })
        );
        assert!(sink.events.is_empty());
    }
}

#[test]
fn failed_fusion_step_publishes_nothing() {
    let mut engine = ScriptedEngine::periodic(3000);
    engine.fail_do_steps = Some(-2);
    let mut svc = started(FakeSensor::new(), engine);
    let mut sink = RecordingSink::new();

    svc.poll(0, &mut sink);
    svc.poll(100, &mut sink);
    assert!(sink.events.is_empty());
    assert_eq!(svc.engine().step_inputs.len(), 1);
    assert_eq!(svc.next_deadline(), Some(3000));
}

#[test]
fn read_failure_publishes_nothing() {
    let mut sensor = FakeSensor::new();
    sensor.fail_get_data = Some(DriverError::Comm(IoError::Bus));
    let mut svc = started(sensor, ScriptedEngine::periodic(3000));
    let mut sink = RecordingSink::new();

    svc.poll(0, &mut sink);
    svc.poll(100, &mut sink);
    assert!(sink.events.is_empty());
    assert!(svc.engine().step_inputs.is_empty());
    assert_eq!(svc.next_deadline(), Some(3000));
}

// ── State persistence ─────────────────────────────────────────

#[test]
fn state_saved_once_interval_accumulates() {
    let config = BsecConfig {
        state_save_interval: 6,
        ..BsecConfig::default()
    };
    let mut svc = service_with(FakeSensor::new(), ScriptedEngine::periodic(3000), config);
    svc.init(0).unwrap();
    let mut sink = RecordingSink::new();

    svc.poll(0, &mut sink);
    svc.poll(100, &mut sink);
    assert_eq!(svc.store().save_count(), 0);

    svc.poll(3000, &mut sink);
    assert_eq!(svc.store().save_count(), 1);
    assert_eq!(svc.store().get("bsec_state.bin"), Some(&[0xA5u8; 16][..]));
    assert_eq!(svc.control().state_save_delay_ms(), 0);
}

#[test]
fn fallback_delay_counts_towards_save_interval() {
    let mut engine = ScriptedEngine::periodic(3000);
    engine.script.push_back(Err(EngineError(-1)));
    let config = BsecConfig {
        state_save_interval: 10,
        ..BsecConfig::default()
    };
    let mut svc = service_with(FakeSensor::new(), engine, config);
    svc.init(0).unwrap();
    let mut sink = RecordingSink::new();

    svc.poll(0, &mut sink);
    assert_eq!(svc.store().save_count(), 1);
}

#[test]
fn state_never_saved_without_path_or_with_negative_interval() {
    for config in [
        BsecConfig {
            state_file: String::new(),
            state_save_interval: 0,
            ..BsecConfig::default()
        },
        BsecConfig {
            state_save_interval: -1,
            ..BsecConfig::default()
        },
    ] {
        let mut svc = service_with(FakeSensor::new(), ScriptedEngine::periodic(3000), config);
        svc.init(0).unwrap();
        let mut sink = RecordingSink::new();
        run_cycles(&mut svc, &mut sink, 3);
        assert_eq!(svc.store().save_count(), 0);
    }
}

// ── Calibration ───────────────────────────────────────────────

#[test]
fn auto_calibration_forces_low_power_then_restores() {
    let mut engine = ScriptedEngine::periodic(3000);
    engine.step_outputs.extend([
        vec![output(OutputSensor::Iaq, 50.0, 1)],
        vec![output(OutputSensor::Iaq, 50.0, 2)],
        vec![output(OutputSensor::Iaq, 50.0, 3)],
        vec![output(OutputSensor::Iaq, 50.0, 3)],
    ]);
    let config = BsecConfig {
        iaq_sample_rate: "ULP".into(),
        iaq_auto_cal: true,
        ..BsecConfig::default()
    };
    let mut svc = Bme68xService::new(FakeSensor::new(), engine, MemBlobStore::new(), config)
        .with_measurement(MeasurementCycle::new(Calibration::with_min_cycles(true, 2)));
    svc.init(0).unwrap();
    let mut sink = RecordingSink::new();

    run_cycles(&mut svc, &mut sink, 1);
    assert_eq!(sink.calibration(), vec![CalibrationStatus::NeedsCalibration]);
    assert_eq!(svc.engine().last_rate(OutputSensor::Iaq), Some(SampleRate::LowPower.hz()));
    assert_eq!(svc.calibration().prev_iaq_rate(), SampleRate::UltraLowPower);

    run_cycles(&mut svc, &mut sink, 3);
    assert_eq!(sink.calibration().len(), 1);
    assert_eq!(svc.calibration().cycles_remaining(), 1);

    run_cycles(&mut svc, &mut sink, 4);
    assert_eq!(
        sink.calibration(),
        vec![CalibrationStatus::NeedsCalibration, CalibrationStatus::Complete]
    );
    assert_eq!(
        svc.engine().last_rate(OutputSensor::Iaq),
        Some(SampleRate::UltraLowPower.hz())
    );
    // calibration event precedes the output of the same cycle
    assert!(matches!(
        sink.events[sink.events.len() - 2],
        bme68x_bsec::app::events::AppEvent::Calibration(CalibrationStatus::Complete)
    ));
}

#[test]
fn calibration_disabled_leaves_rates_alone() {
    let mut engine = ScriptedEngine::periodic(3000);
    engine.default_outputs = vec![output(OutputSensor::Iaq, 50.0, 0)];
    let mut svc = started(FakeSensor::new(), engine);
    let before = svc.engine().subscriptions.len();
    let mut sink = RecordingSink::new();
    run_cycles(&mut svc, &mut sink, 2);
    assert!(sink.calibration().is_empty());
    assert_eq!(svc.engine().subscriptions.len(), before);
}

// ── Commands ──────────────────────────────────────────────────

#[test]
fn start_is_idempotent() {
    let mut svc = started(FakeSensor::new(), ScriptedEngine::periodic(3000));
    let mut sink = RecordingSink::new();
    svc.poll(0, &mut sink);
    let pending = svc.control().pending().cloned();
    assert!(!svc.start(50));
    svc.handle_command(AppCommand::Start, 60).unwrap();
    assert_eq!(svc.control().pending().cloned(), pending);
}

#[test]
fn heat_source_applied_to_temperature_input() {
    let mut svc = started(FakeSensor::new(), ScriptedEngine::periodic(3000));
    svc.handle_command(AppCommand::SetHeatSource(1.5), 0).unwrap();
    assert_eq!(svc.heat_source(), 1.5);
    let mut sink = RecordingSink::new();
    run_cycles(&mut svc, &mut sink, 1);
    let heat = svc.engine().step_inputs[0]
        .iter()
        .find(|i| i.sensor == InputSensor::HeatSource)
        .map(|i| i.signal);
    assert_eq!(heat, Some(1.5));
}

#[test]
fn sample_rate_command_updates_subscription() {
    let mut svc = started(FakeSensor::new(), ScriptedEngine::periodic(3000));
    svc.handle_command(
        AppCommand::SetSampleRate(ChannelGroup::Temperature, SampleRate::UltraLowPower),
        0,
    )
    .unwrap();
    assert_eq!(
        svc.engine().last_rate(OutputSensor::RawTemperature),
        Some(SampleRate::UltraLowPower.hz())
    );

    svc.set_ps_sample_rate(SampleRate::LowPower).unwrap();
    assert_eq!(
        svc.engine().last_rate(OutputSensor::RawPressure),
        Some(SampleRate::LowPower.hz())
    );

    svc.set_iaq_sample_rate(SampleRate::UltraLowPower).unwrap();
    assert_eq!(svc.calibration().prev_iaq_rate(), SampleRate::UltraLowPower);
}

#[test]
fn blob_commands_round_trip_through_store() {
    let mut svc = started(FakeSensor::new(), ScriptedEngine::periodic(3000));

    svc.handle_command(AppCommand::SaveState("snap.bin".into()), 0).unwrap();
    assert_eq!(svc.store().get("snap.bin"), Some(&[0xA5u8; 16][..]));

    svc.handle_command(AppCommand::LoadState("snap.bin".into()), 0).unwrap();
    assert_eq!(svc.engine().loaded_state.as_deref(), Some(&[0xA5u8; 16][..]));

    assert_eq!(
        svc.handle_command(AppCommand::LoadState("missing.bin".into()), 0),
        Err(Error::Config(ConfigError::NotFound))
    );
}

#[test]
fn short_config_blob_is_truncated() {
    let store = MemBlobStore::new()
        .with("short.config", &[1, 2, 3])
        .with("ok.config", &[0, 0, 0, 0, 4, 5]);
    let mut svc = Bme68xService::new(
        FakeSensor::new(),
        ScriptedEngine::periodic(3000),
        store,
        BsecConfig::default(),
    );
    svc.init(0).unwrap();
    assert_eq!(
        svc.load_configuration_from("short.config"),
        Err(ConfigError::Truncated { len: 3 })
    );
    svc.load_configuration_from("ok.config").unwrap();
    assert_eq!(svc.engine().config.as_deref(), Some(&[4u8, 5][..]));
}
