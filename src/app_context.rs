use std::time::{Duration, Instant};
use egui::{CentralPanel, Color32, Context, ProgressBar, TopBottomPanel};
use eframe::Frame;
use tracing::{info, warn};

use swing_link::osc_sender::OscAxisSender;
use swing_link::osc_server::OscPositionServer;
use swing_link::settings::Settings;
use swing_link::swing::{ArmSwingEstimator, MovementInputSource};
use swing_link::tracking::{TrackedNode, TrackedPointSample};

pub struct AppContext {
    settings: Settings,
    estimator: ArmSwingEstimator<OscPositionServer>,
    sender: Option<OscAxisSender>,
    output_error: Option<String>,
    settings_error: Option<String>,
    last_tick: Instant,
    last_input: f32,
}

impl AppContext {
    pub fn new(settings: Settings) -> anyhow::Result<Self> {
        let config = settings.swing_config()?;

        let server = OscPositionServer::new(
            settings.listen_port,
            &settings.position_prefix,
            Duration::from_millis(settings.stale_after_ms),
        );

        let estimator = ArmSwingEstimator::with_nodes(
            server,
            settings.left_hand_node,
            settings.right_hand_node,
            config,
        );

        let mut context = Self {
            settings,
            estimator,
            sender: None,
            output_error: None,
            settings_error: None,
            last_tick: Instant::now(),
            last_input: 0.0,
        };
        context.connect_output();

        Ok(context)
    }

    fn connect_output(&mut self) {
        self.sender = None;
        if !self.settings.output_enabled {
            return;
        }

        match OscAxisSender::connect_to(&self.settings.output_target, &self.settings.output_address) {
            Ok(sender) => {
                info!(destination = %sender.target(), address = %self.settings.output_address, "sending movement input");
                self.sender = Some(sender);
                self.output_error = None;
            }
            Err(error) => self.report_output_error(error),
        }
    }

    fn report_output_error(&mut self, error: anyhow::Error) {
        let message = format!("{:#}", error);
        if self.output_error.as_deref() != Some(message.as_str()) {
            warn!("OSC output error: {}", message);
        }
        self.output_error = Some(message);
    }

    fn tick(&mut self) {
        let delta_time = self.last_tick.elapsed().as_secs_f32();
        self.last_tick = Instant::now();

        let input = self.estimator.read_input(delta_time);
        self.last_input = input.y;

        match self.sender.as_ref().map(|sender| sender.send_axis(input.y)) {
            Some(Err(error)) => self.report_output_error(error),
            Some(Ok(())) => self.output_error = None,
            None => {}
        }
    }

    fn apply_swing_settings(&mut self) {
        match self.settings.swing_config() {
            Ok(config) => {
                self.estimator.set_config(config);
                self.settings_error = None;
            }
            Err(error) => self.settings_error = Some(error.to_string()),
        }
    }

    fn hand_status(&self, node: TrackedNode, sample: &TrackedPointSample) -> (Color32, String) {
        let table = self.estimator.provider().table();
        let valid = table.position_at(node, Instant::now()).is_some();

        match (valid, table.last_seen(node)) {
            (true, _) => {
                let p = sample.last_position;
                (Color32::GREEN, format!("{:.2}, {:.2}, {:.2}", p.x, p.y, p.z))
            }
            (false, Some(seen)) => (
                Color32::YELLOW,
                format!("stale ({:.1}s ago)", seen.received_at.elapsed().as_secs_f32()),
            ),
            (false, None) => (Color32::RED, "no data".into()),
        }
    }
}

impl eframe::App for AppContext {
    fn update(&mut self, ctx: &Context, _frame: &mut Frame) {
        self.tick();

        // Draw top bar
        TopBottomPanel::top("title_bar").show(ctx, |ui| {
            ui.vertical(|ui| {
                ui.heading("SwingLink");

                if let Some(error) = &self.output_error {
                    ui.colored_label(Color32::RED, format!("Output error: {}", error));
                }
                ui.add_space(2.0);
            });
        });

        CentralPanel::default().show(ctx, |ui| {
            ui.vertical(|ui| {
                let (left_node, right_node) = self.estimator.nodes();
                for (label, node, sample) in [
                    ("Left", left_node, self.estimator.left_sample()),
                    ("Right", right_node, self.estimator.right_sample()),
                ] {
                    let (color, status) = self.hand_status(node, sample);
                    ui.horizontal(|ui| {
                        ui.label(format!("{} ({}):", label, node));
                        ui.colored_label(color, status);
                    });
                }

                ui.add_space(10.0);

                ui.add(ProgressBar::new(self.last_input).show_percentage());
                ui.label(format!(
                    "Forward speed: {:.2} m/s",
                    self.estimator.config().forward_speed(self.last_input)
                ));

                ui.add_space(10.0);

                let mut changed = false;
                ui.horizontal(|ui| {
                    ui.label("Max speed (m/s):");
                    changed |= ui
                        .add(egui::DragValue::new(&mut self.settings.max_speed).speed(0.1).range(0.0..=10.0))
                        .changed();
                });
                ui.horizontal(|ui| {
                    ui.label("Swing speed for max (m/s):");
                    changed |= ui
                        .add(
                            egui::DragValue::new(&mut self.settings.controller_speed_for_max_speed)
                                .speed(0.1)
                                .range(0.1..=10.0),
                        )
                        .changed();
                });
                ui.horizontal(|ui| {
                    ui.label("Smoothing:");
                    changed |= ui
                        .add(egui::Slider::new(&mut self.settings.smoothing, 0.0..=1.0))
                        .changed();
                });
                if changed {
                    self.apply_swing_settings();
                }

                ui.horizontal(|ui| {
                    ui.label("OSC output:");
                    if ui.checkbox(&mut self.settings.output_enabled, "").changed() {
                        self.connect_output();
                    }
                });

                if let Some(error) = &self.settings_error {
                    ui.colored_label(Color32::RED, error);
                }

                if ui.button("Save settings").clicked() {
                    match self.settings.save() {
                        Ok(()) => self.settings_error = None,
                        Err(error) => self.settings_error = Some(error.to_string()),
                    }
                }

                ui.add_space(10.0);

                ui.collapsing("Seen OSC addresses", |ui| {
                    let mut addresses: Vec<_> = self.estimator.provider().get_found_addresses().into_iter().collect();
                    addresses.sort();
                    for address in addresses {
                        ui.monospace(address);
                    }
                });
            });
        });

        ctx.request_repaint();
    }
}

impl Drop for AppContext {
    fn drop(&mut self) {
        if let Some(sender) = &self.sender {
            // Leave the client standing still
            _ = sender.send_axis(0.0);
        }
    }
}
