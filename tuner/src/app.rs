use crate::error::Error;
use eframe::egui::{ImageData, Slider, Ui};
use eframe::{
    egui::{self, Color32, ColorImage, Context, TextureHandle, TextureOptions},
    Frame, Storage,
};
use opencv::core::Mat;
use opencv::imgproc::{COLOR_BGR2RGBA, COLOR_GRAY2RGBA};
use std::path::PathBuf;
use std::sync::Arc;
use turret_vision::config::{ColorPreset, ColorRange};
use turret_vision::cv::{mat_size_and_vec, to_rgba};
use turret_vision::{list_devices, Camera, FrameSource, Mode, Outcome, Vision, VisionConfig};

const SETTINGS_KEY: &str = "tuner-settings";

#[derive(serde::Deserialize, serde::Serialize)]
#[serde(default)]
struct TunerSettings {
    config: VisionConfig,
    mode: Mode,
    mask_view: bool,
    export_path: String,
}

impl Default for TunerSettings {
    fn default() -> Self {
        Self {
            config: VisionConfig::default(),
            mode: Mode::TrackingShooting,
            mask_view: false,
            export_path: "vision.toml".to_string(),
        }
    }
}

impl TunerSettings {
    fn toggles(&mut self, ui: &mut Ui) {
        ui.horizontal(|ui| {
            ui.toggle_value(&mut self.mask_view, "Mask");
            ui.toggle_value(&mut self.config.camera.flip, "Flip image");
        });
    }

    fn mode(&mut self, ui: &mut Ui) {
        ui.horizontal(|ui| {
            ui.radio_value(&mut self.mode, Mode::TrackingShooting, "Shooting");
            ui.radio_value(&mut self.mode, Mode::TrackingGear, "Gear");
            ui.radio_value(&mut self.mode, Mode::Calibration, "Calibration");
        });
    }

    fn preset(&mut self, ui: &mut Ui) {
        ui.horizontal(|ui| {
            ui.monospace("Target color:");
            ui.radio_value(&mut self.config.color.target, ColorPreset::Green, "Green");
            ui.radio_value(&mut self.config.color.target, ColorPreset::Sample, "Sample");
            if ui.button("Reset").clicked() {
                *self.config.color.active_mut() = match self.config.color.target {
                    ColorPreset::Green => ColorRange::GREEN,
                    ColorPreset::Sample => ColorRange::SAMPLE,
                };
            }
        });
    }

    fn areas(&mut self, ui: &mut Ui) {
        let tracking = &mut self.config.tracking;
        ui.add(
            Slider::new(&mut tracking.min_goal_area, 0f64..=50000f64)
                .step_by(1f64)
                .text("Goal min area"),
        );
        ui.add(
            Slider::new(&mut tracking.gear_min_area, 0f64..=100000f64)
                .step_by(1f64)
                .text("Gear min area"),
        );
        ui.add(
            Slider::new(&mut tracking.gear_max_area, 0f64..=100000f64)
                .step_by(1f64)
                .text("Gear max area"),
        );
    }

    // hue is 0..180 in 8-bit OpenCV HSV
    fn upper(&mut self, ui: &mut Ui) {
        let upper = &mut self.config.color.active_mut().upper;
        ui.vertical(|ui| {
            ui.monospace("Upper bound:");
            ui.add(Slider::new(&mut upper.0, 0..=180).text("Hue"));
            ui.add(Slider::new(&mut upper.1, 0..=255).text("Saturation"));
            ui.add(Slider::new(&mut upper.2, 0..=255).text("Value"));
        });
    }

    fn lower(&mut self, ui: &mut Ui) {
        let lower = &mut self.config.color.active_mut().lower;
        ui.vertical(|ui| {
            ui.monospace("Lower bound:");
            ui.add(Slider::new(&mut lower.0, 0..=180).text("Hue"));
            ui.add(Slider::new(&mut lower.1, 0..=255).text("Saturation"));
            ui.add(Slider::new(&mut lower.2, 0..=255).text("Value"));
        });
    }
}

#[derive(Default)]
pub(crate) struct App {
    tex_handler: Option<TextureHandle>,
    camera: Option<Camera>,

    settings_open: bool,
    settings: TunerSettings,
    readout: String,

    error: Option<Error>,
    error_open: bool,
}

impl App {
    pub(crate) fn new(cc: &eframe::CreationContext) -> Self {
        let settings: TunerSettings = cc
            .storage
            .and_then(|s| eframe::get_value(s, SETTINGS_KEY))
            .unwrap_or_default();

        let mut app = Self {
            settings,
            ..Default::default()
        };
        if let Err(err) = app.connect() {
            app.fail(err);
        }

        app
    }

    fn connect(&mut self) -> crate::Result<()> {
        // the old handle has to be released before the device can reopen
        self.camera = None;
        self.camera = Some(Camera::open(&self.settings.config.camera)?);

        Ok(())
    }

    fn fail(&mut self, err: Error) {
        if !self.error_open {
            log::error!("{err}");
            self.error_open = true;
            self.error = Some(err);
        }
    }

    fn port_picker(&mut self, ui: &mut Ui) -> crate::Result<()> {
        let ports = list_devices()?;
        let port = &mut self.settings.config.telemetry.port;
        let before = port.clone();

        egui::ComboBox::from_label("Port")
            .selected_text(
                port.as_ref()
                    .map(|v| v.to_string_lossy().to_string())
                    .unwrap_or("None".to_string()),
            )
            .show_ui(ui, |ui| {
                ui.selectable_value(port, None::<PathBuf>, "None");
                for candidate in ports {
                    let label = candidate.display().to_string();
                    ui.selectable_value(port, Some(candidate), label);
                }
            });

        if *port != before {
            log::info!("telemetry port set to {port:?}");
        }

        Ok(())
    }

    fn top_bar(&mut self, ui: &mut Ui) -> crate::Result<()> {
        ui.horizontal(|ui| -> crate::Result<()> {
            self.port_picker(ui)?;
            if ui.button("Tune color").clicked() {
                self.settings_open = !self.settings_open;
            }
            if ui.button("Reconnect camera").clicked() {
                self.connect()?;
            }
            Ok(())
        })
        .inner
    }

    fn export(&mut self, ui: &mut Ui) -> crate::Result<()> {
        ui.horizontal(|ui| -> crate::Result<()> {
            ui.text_edit_singleline(&mut self.settings.export_path);
            if ui.button("Export").clicked() {
                let mut config = self.settings.config.clone();
                config.mode = Some(self.settings.mode);
                config.validate()?;
                config.save(&self.settings.export_path)?;
                log::info!("config written to {}", self.settings.export_path);
            }
            Ok(())
        })
        .inner
    }

    fn tuning_controls(&mut self, ui: &mut Ui) -> crate::Result<()> {
        self.settings.toggles(ui);
        self.settings.mode(ui);
        self.settings.preset(ui);
        self.settings.areas(ui);
        ui.horizontal(|ui| {
            self.settings.upper(ui);
            self.settings.lower(ui);
        });
        self.export(ui)
    }

    /// Runs one frame through the tracker and returns the image to display.
    fn process(&mut self) -> crate::Result<Mat> {
        let camera = self.camera.as_mut().ok_or(Error::NoCamera)?;
        camera.set_flip(self.settings.config.camera.flip);
        let frame = camera.read_frame()?;

        let vision = Vision::new(self.settings.mode, &self.settings.config);
        let report = vision.process(&frame)?;

        self.readout = match &report.outcome {
            Outcome::Calibration(sample) => format!("Sample: {sample}"),
            Outcome::Tracking(result) => match (result.alignment, result.horizontal) {
                (Some(alignment), Some(hint)) => format!(
                    "Angle {:.2}°, error {} px, aligned {} ({hint})",
                    alignment.angle_to_turn.to_degrees(),
                    alignment.horizontal_error,
                    alignment.aligned
                ),
                _ => "No target".to_string(),
            },
        };

        match (&report.mask, self.settings.mask_view) {
            (Some(mask), true) => Ok(to_rgba(mask, COLOR_GRAY2RGBA)?),
            _ => Ok(to_rgba(&report.preview, COLOR_BGR2RGBA)?),
        }
    }

    fn central_panel(&mut self, ui: &mut Ui) -> crate::Result<()> {
        let image = self.process()?;
        let (size, pixels) = mat_size_and_vec(&image)?;

        let texture = self.tex_handler.get_or_insert_with(|| {
            ui.ctx().load_texture(
                "camera-frame",
                ColorImage::new(size, Color32::LIGHT_YELLOW),
                TextureOptions::default(),
            )
        });
        texture.set(
            ImageData::Color(Arc::new(ColorImage::from_rgba_unmultiplied(size, &pixels))),
            TextureOptions::default(),
        );

        ui.image((texture.id(), texture.size_vec2()));
        ui.monospace(&self.readout);

        if self.settings_open {
            self.tuning_controls(ui)?;
        }

        Ok(())
    }

    fn show_err(&mut self, ctx: &Context) {
        let message = self
            .error
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();

        egui::Window::new("Error").show(ctx, |ui| {
            ui.label("An error was encountered:");
            ui.monospace(message);
            ui.horizontal(|ui| {
                if ui.button("Ok").clicked() {
                    self.error_open = false;
                    self.error = None;
                }
            });
        });
    }

    fn app(&mut self, ctx: &Context, _frame: &mut Frame) -> crate::Result<()> {
        if self.error_open {
            self.show_err(ctx);
        }

        egui::TopBottomPanel::top("top-row")
            .show(ctx, |ui| self.top_bar(ui))
            .inner?;

        egui::CentralPanel::default()
            .show(ctx, |ui| self.central_panel(ui))
            .inner?;

        Ok(())
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &Context, frame: &mut Frame) {
        if let Err(err) = self.app(ctx, frame) {
            self.fail(err);
        }

        ctx.request_repaint();
    }

    fn save(&mut self, storage: &mut dyn Storage) {
        eframe::set_value(storage, SETTINGS_KEY, &self.settings);
    }
}
