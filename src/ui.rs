use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use egui::{self, Align2, Color32, ComboBox, FontId, Layout, Rounding, Stroke};

use ringscope::{CircularBuffer, SampleGenerator, ScopeSettings, ViewMode, WaveformKind};

const ACCENT: Color32 = Color32::from_rgb(80, 200, 255);
const CURSOR_MARKER: Color32 = Color32::from_rgb(230, 60, 60);
const SCOPE_HEIGHT: f32 = 260.0;

pub struct ScopeApp {
    buffer: Arc<CircularBuffer>,
    generator: SampleGenerator,
    settings_path: PathBuf,
    settings: ScopeSettings,
    /// Set while the user expects samples to be flowing.
    want_running: bool,
    error: Option<String>,
}

impl ScopeApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        buffer: Arc<CircularBuffer>,
        generator: SampleGenerator,
        settings_path: PathBuf,
        settings: ScopeSettings,
        start_error: Option<String>,
    ) -> Self {
        apply_theme(&cc.egui_ctx);
        Self {
            want_running: generator.is_running(),
            buffer,
            generator,
            settings_path,
            settings,
            error: start_error,
        }
    }

    fn start(&mut self) {
        match self
            .generator
            .start(self.settings.chunk_duration, self.settings.write_interval)
        {
            Ok(()) => self.want_running = true,
            Err(err) => self.error = Some(err.to_string()),
        }
    }

    fn stop(&mut self) {
        self.want_running = false;
        if let Err(err) = self.generator.stop() {
            self.error = Some(err.to_string());
        }
    }

    fn apply_signal_changes(&mut self) {
        let resume = self.want_running;
        self.stop();
        if let Err(err) = self.generator.set_waveform(self.settings.build_waveform()) {
            self.error = Some(err.to_string());
            return;
        }
        if resume {
            self.start();
        }
        self.settings.save(&self.settings_path);
    }

    // A waveform panic ends the thread on its own; reap it so the message
    // reaches the status line.
    fn check_generator(&mut self) {
        if self.want_running && !self.generator.is_running() {
            self.stop();
        }
    }
}

impl eframe::App for ScopeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.request_repaint_after(Duration::from_millis(self.settings.plot_interval_ms));
        self.check_generator();

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(4.0);
            let mut toggle = false;
            ui.horizontal(|ui| {
                ui.strong("Ring Scope");
                ui.separator();
                let label = if self.want_running { "Stop" } else { "Start" };
                if ui.button(label).clicked() {
                    toggle = true;
                }
                ui.separator();
                ui.label(format!("t = {:.3} s", self.generator.time_offset()));
                ui.with_layout(Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(format!(
                        "{} Hz · {} s chunks every {} s",
                        self.generator.sample_rate(),
                        self.settings.chunk_duration,
                        self.settings.write_interval
                    ));
                });
            });
            ui.add_space(6.0);

            let layout_status = format!(
                "cursor {:>6} / {}",
                self.buffer.write_cursor(),
                self.buffer.capacity()
            );
            panel(ui, self.settings.view.label(), Some(layout_status), |ui| {
                draw_scope(ui, &self.buffer, &self.settings)
            });
            ui.add_space(8.0);

            let mut apply = false;
            panel(ui, "Signal", None, |ui| {
                apply = signal_controls(ui, &mut self.settings);
            });

            if toggle {
                self.error = None;
                if self.want_running {
                    self.stop();
                } else {
                    self.start();
                }
            }
            if apply {
                self.error = None;
                self.apply_signal_changes();
            }

            if let Some(err) = &self.error {
                ui.colored_label(Color32::RED, format!("Generator: {err}"));
            }
        });
    }
}

/// Returns true when the user asked to apply the edited parameters.
fn signal_controls(ui: &mut egui::Ui, settings: &mut ScopeSettings) -> bool {
    ui.horizontal(|ui| {
        ui.label("Waveform");
        ComboBox::from_id_source("waveform")
            .selected_text(settings.waveform.label())
            .show_ui(ui, |ui| {
                for kind in WaveformKind::ALL {
                    ui.selectable_value(&mut settings.waveform, kind, kind.label());
                }
            });
        ui.separator();
        ui.label("View");
        ComboBox::from_id_source("view")
            .selected_text(settings.view.label())
            .show_ui(ui, |ui| {
                for view in ViewMode::ALL {
                    ui.selectable_value(&mut settings.view, view, view.label());
                }
            });
    });

    ui.add(
        egui::Slider::new(&mut settings.frequency, 0.05..=50.0)
            .logarithmic(true)
            .text("Frequency (Hz)"),
    );
    ui.add(egui::Slider::new(&mut settings.offset, -2.0..=2.0).text("Offset"));
    if settings.waveform == WaveformKind::TrapezoidPulse {
        ui.add(egui::Slider::new(&mut settings.amplitude, 0.0..=4.0).text("Amplitude"));
        ui.add(egui::Slider::new(&mut settings.edge_time, 0.0..=0.4).text("Edge time (periods)"));
    }
    ui.add_space(4.0);
    ui.button("Apply").clicked()
}

fn draw_scope(ui: &mut egui::Ui, buffer: &CircularBuffer, settings: &ScopeSettings) {
    let desired = egui::vec2(ui.available_width().max(200.0), SCOPE_HEIGHT);
    let (rect, _) = ui.allocate_exact_size(desired, egui::Sense::hover());
    let painter = ui.painter_at(rect);
    painter.rect(
        rect,
        Rounding::same(6.0),
        ui.visuals().faint_bg_color,
        Stroke::new(1.0, ui.visuals().weak_text_color()),
    );

    let (data, cursor) = match settings.view {
        ViewMode::Raw => {
            let raw = buffer.raw_snapshot();
            (raw.samples, Some(raw.write_cursor))
        }
        ViewMode::Chronological => match buffer.read_latest(buffer.capacity()) {
            Ok(samples) => (samples, None),
            Err(err) => {
                painter.text(
                    rect.center(),
                    Align2::CENTER_CENTER,
                    err.to_string(),
                    FontId::proportional(14.0),
                    ui.visuals().weak_text_color(),
                );
                return;
            }
        },
    };
    if data.len() < 2 {
        painter.text(
            rect.center(),
            Align2::CENTER_CENTER,
            "Buffer too small to plot",
            FontId::proportional(14.0),
            ui.visuals().weak_text_color(),
        );
        return;
    }

    let span = (settings.y_max - settings.y_min).max(f32::EPSILON);
    let last = (data.len() - 1) as f32;
    let to_screen = |index: usize, sample: f64| {
        let x = egui::lerp(rect.x_range(), index as f32 / last);
        let norm = (sample as f32 - settings.y_min) / span;
        let y = egui::lerp(rect.y_range(), 1.0 - norm.clamp(0.0, 1.0));
        egui::pos2(x, y)
    };

    // two points per horizontal pixel is plenty
    let stride = (data.len() / (rect.width() as usize * 2).max(1)).max(1);
    let mut points: Vec<egui::Pos2> = data
        .iter()
        .enumerate()
        .step_by(stride)
        .map(|(i, &sample)| to_screen(i, sample))
        .collect();
    if (data.len() - 1) % stride != 0 {
        points.push(to_screen(data.len() - 1, data[data.len() - 1]));
    }
    painter.add(egui::Shape::line(points, Stroke::new(2.0, ACCENT)));

    if let Some(cursor) = cursor {
        let marker = to_screen(cursor, data[cursor]);
        painter.circle_filled(marker, 4.0, CURSOR_MARKER);
    }
}

/// Grouped section with a title on the left and an optional status readout
/// on the right.
fn panel(
    ui: &mut egui::Ui,
    title: &str,
    status: Option<String>,
    add_contents: impl FnOnce(&mut egui::Ui),
) {
    egui::Frame::group(ui.style())
        .fill(ui.visuals().extreme_bg_color)
        .rounding(Rounding::same(4.0))
        .show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new(title).color(ACCENT).strong());
                if let Some(status) = status {
                    ui.with_layout(Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.monospace(status);
                    });
                }
            });
            ui.add_space(4.0);
            add_contents(ui);
        });
}

fn apply_theme(ctx: &egui::Context) {
    let mut style = (*ctx.style()).clone();
    style.visuals = egui::Visuals::dark();
    style.visuals.widgets.noninteractive.bg_fill = Color32::from_rgb(16, 18, 20);
    style.visuals.widgets.inactive.bg_fill = Color32::from_rgb(30, 32, 36);
    style.visuals.selection.bg_fill = ACCENT;
    style.visuals.selection.stroke = Stroke::new(1.0, Color32::from_rgb(10, 10, 12));
    style.visuals.window_fill = Color32::from_rgb(12, 13, 15);
    ctx.set_style(style);
}
