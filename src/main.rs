mod ui;

use std::sync::Arc;

use ringscope::{CircularBuffer, SampleGenerator, ScopeSettings, default_settings_path};
use ui::ScopeApp;

fn main() -> eframe::Result<()> {
    env_logger::init();

    let settings_path = default_settings_path();
    let settings = ScopeSettings::load(&settings_path);

    let buffer = Arc::new(
        CircularBuffer::new(settings.capacity).expect("settings guarantee a positive capacity"),
    );
    let mut generator = SampleGenerator::new(
        Arc::clone(&buffer),
        settings.sample_rate,
        settings.build_waveform(),
    )
    .expect("settings only hold finite sample rates up to 1 MHz");
    let start_error = generator
        .start(settings.chunk_duration, settings.write_interval)
        .err()
        .map(|err| err.to_string());

    let options = eframe::NativeOptions::default();
    eframe::run_native(
        "Ring Scope",
        options,
        Box::new(move |cc| {
            Box::new(ScopeApp::new(
                cc,
                buffer,
                generator,
                settings_path,
                settings,
                start_error,
            ))
        }),
    )
}
