use eframe::egui::{self, TopBottomPanel};
use egui_chart::structure::TempoSegmentId;
use egui_chart::utils::format_time;
use egui_chart::{
    Beatmap, ChartEditor, ClockTransport, EditorConfig, HistoryStore, Lane, MapStore, Note, Snap,
    SvPattern, SvPatternId, SystemClipboard, TempoSegment, Transport,
};
use std::path::PathBuf;
use std::sync::Arc;

const CONFIG_ENV: &str = "CHART_EDITOR_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "chart_editor.json";

fn main() -> eframe::Result<()> {
    env_logger::init();

    let config_path = std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let config = EditorConfig::load_or_default(&config_path);

    let native_options = eframe::NativeOptions::default();
    eframe::run_native(
        "egui Chart Editor Example",
        native_options,
        Box::new(move |_cc| Ok(Box::new(ChartApp::new(&config)))),
    )
}

struct ChartApp {
    editor: ChartEditor,
    store: HistoryStore,
    transport: ClockTransport,
    clipboard: SystemClipboard,
    status_line: String,
}

impl ChartApp {
    fn new(config: &EditorConfig) -> Self {
        Self {
            editor: ChartEditor::from_config(config),
            store: HistoryStore::new(demo_chart()),
            transport: ClockTransport::new(),
            clipboard: SystemClipboard::new(),
            status_line: "Ready".to_owned(),
        }
    }

    fn menu_bar(&mut self, ui: &mut egui::Ui) {
        egui::menu::bar(ui, |ui| {
            ui.menu_button("Chart", |ui| {
                if ui.button("New").clicked() {
                    self.store.reset(Beatmap::with_tempo(120.0));
                    self.transport.seek(0.0);
                    self.set_status("Created new chart");
                    ui.close_menu();
                }
                if ui.button("Load demo").clicked() {
                    self.store.reset(demo_chart());
                    self.set_status("Loaded demo chart");
                    ui.close_menu();
                }
            });
            ui.menu_button("Edit", |ui| {
                if ui
                    .add_enabled(self.store.can_undo(), egui::Button::new("Undo"))
                    .clicked()
                {
                    self.store.undo();
                    ui.close_menu();
                }
                if ui
                    .add_enabled(self.store.can_redo(), egui::Button::new("Redo"))
                    .clicked()
                {
                    self.store.redo();
                    ui.close_menu();
                }
            });

            ui.separator();
            let play_label = if self.transport.is_playing() { "Pause" } else { "Play" };
            if ui.button(play_label).clicked() {
                self.transport.toggle();
            }
            if ui.button("Rewind").clicked() {
                self.transport.seek(0.0);
            }

            ui.separator();
            let mut snap = self.editor.snap();
            egui::ComboBox::from_label("Snap")
                .selected_text(snap.label())
                .show_ui(ui, |ui| {
                    for candidate in Snap::ALL {
                        ui.selectable_value(&mut snap, candidate, candidate.label());
                    }
                });
            self.editor.set_snap(snap);
        });
    }

    fn tempo_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Tempo");
        let map = self.store.map();
        let mut next: Option<Beatmap> = None;
        let mut removed: Option<TempoSegmentId> = None;

        for segment in &map.tempo_segments {
            ui.horizontal(|ui| {
                let mut start = segment.start_time;
                let mut bpm = segment.bpm;
                let start_changed = ui
                    .add(egui::DragValue::new(&mut start).speed(0.01).range(0.0..=f64::MAX).suffix(" s"))
                    .changed();
                let bpm_changed = ui
                    .add(egui::DragValue::new(&mut bpm).speed(0.1).range(1.0..=1000.0).suffix(" bpm"))
                    .changed();
                if start_changed {
                    next = Some(map.set_segment_start(segment.id, start));
                } else if bpm_changed {
                    next = Some(map.set_segment_bpm(segment.id, bpm));
                }
                if ui.small_button("✕").clicked() {
                    removed = Some(segment.id);
                }
            });
        }
        if let Some(id) = removed {
            next = Some(map.remove_tempo_segment(id));
        }
        if ui.button("Add segment at playhead").clicked() {
            let now = self.transport.current_time();
            let bpm = map.tempo_map().segment_at(now).map(|s| s.bpm).unwrap_or(120.0);
            next = Some(map.with_tempo_segment(TempoSegment::new(now, bpm)));
        }
        if let Some(next) = next {
            self.store.set_map(Arc::new(next));
        }
    }

    fn sv_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("SV patterns");
        let map = self.store.map();
        let mut next: Option<Beatmap> = None;
        let mut active = self.editor.active_sv_pattern();

        ui.radio_value(&mut active, None, "No pattern");
        for (id, pattern) in &map.sv_patterns {
            let usage = map.pattern_usage(*id);
            ui.horizontal(|ui| {
                ui.radio_value(&mut active, Some(*id), pattern_label(*id));
                let mut edited = *pattern;
                let from_changed = ui
                    .add(egui::DragValue::new(&mut edited.from).speed(0.01).range(0.0..=1.0).prefix("from "))
                    .changed();
                let to_changed = ui
                    .add(egui::DragValue::new(&mut edited.to).speed(0.01).range(0.0..=1.0).prefix("to "))
                    .changed();
                if from_changed || to_changed {
                    next = Some(map.set_sv_pattern(*id, edited));
                }
                if ui
                    .add_enabled(usage == 0, egui::Button::new("✕"))
                    .on_disabled_hover_text(format!("used by {usage} notes"))
                    .clicked()
                {
                    next = Some(map.remove_sv_pattern(*id));
                }
            });
            if pattern.curve().error {
                ui.colored_label(egui::Color32::from_rgb(230, 60, 60), "SV too powerful");
            }
        }
        if ui.button("Add pattern").clicked() {
            let (with_pattern, id) = map.add_sv_pattern(SvPattern::linear());
            next = Some(with_pattern);
            active = Some(id);
        }

        self.editor.set_active_sv_pattern(active);
        if let Some(next) = next {
            self.store.set_map(Arc::new(next));
        }
    }

    fn status_bar(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label(format_time(self.transport.current_time()));
            ui.separator();
            ui.label(format!("snap {}", self.editor.snap().label()));
            ui.separator();
            ui.label(format!("{} selected", self.editor.selected_notes().len()));
            ui.separator();
            ui.label(self.status_line.as_str());
        });
    }

    fn set_status<S: Into<String>>(&mut self, msg: S) {
        self.status_line = msg.into();
        log::info!("{}", self.status_line);
    }
}

impl eframe::App for ChartApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let dt = ctx.input(|i| i.stable_dt) as f64;
        self.transport.advance(dt);

        TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            self.menu_bar(ui);
        });

        TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            self.status_bar(ui);
        });

        egui::SidePanel::left("chart_panels")
            .resizable(true)
            .show(ctx, |ui| {
                self.tempo_panel(ui);
                ui.separator();
                self.sv_panel(ui);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.editor
                .ui(ui, &mut self.store, &mut self.transport, &mut self.clipboard);
        });

        for event in self.editor.take_events() {
            log::debug!("[EditorEvent] {:?}", event);
        }
    }
}

fn demo_chart() -> Beatmap {
    let mut map = Beatmap::with_tempo(120.0).with_tempo_segment(TempoSegment::new(8.0, 150.0));
    map.metadata.title = "Demo".to_owned();
    let (with_pattern, pattern) = map.add_sv_pattern(SvPattern::new(0.25, 0.5));
    map = with_pattern;

    for beat in 0..16 {
        let time = beat as f64 * 0.5;
        map.notes.push(Note::tap(time, Lane::Key((beat % 4) as u8)));
    }
    map.notes.push(Note::new(2.0, 3.0, Lane::Key(1)));
    map.notes.push(Note::new(4.0, 6.0, Lane::Sv).with_pattern(Some(pattern)));
    map.sort_notes();
    map
}

fn pattern_label(id: SvPatternId) -> String {
    format!("#{}", id.0)
}
