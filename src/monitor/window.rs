//! Live annotated preview window.
//!
//! The window runs on the main thread (most platforms require it) and
//! reads frames from a `LiveFeed` that a `FeedPreview` fills from the loop
//! thread. Pressing `q` in the window, or closing it, requests a stop.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use eframe::egui;

use super::preview::LiveFeed;
use super::stop::StopToken;
use crate::frame::Frame;

const REPAINT_INTERVAL: Duration = Duration::from_millis(15);

pub struct PreviewWindow {
    feed: Arc<LiveFeed>,
    stop: StopToken,
    texture: Option<egui::TextureHandle>,
    tick: u64,
}

impl PreviewWindow {
    pub fn new(feed: Arc<LiveFeed>, stop: StopToken) -> Self {
        Self {
            feed,
            stop,
            texture: None,
            tick: 0,
        }
    }

    fn upload(&mut self, ctx: &egui::Context, frame: &Frame) {
        let image = egui::ColorImage::from_rgb(
            [frame.width as usize, frame.height as usize],
            frame.pixels(),
        );
        match &mut self.texture {
            Some(texture) => texture.set(image, egui::TextureOptions::default()),
            None => {
                self.texture =
                    Some(ctx.load_texture("watchpost-frame", image, Default::default()))
            }
        }
    }
}

impl eframe::App for PreviewWindow {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if let Some((frame, tick)) = self.feed.take_latest() {
            self.upload(ctx, &frame);
            self.tick = tick;
        }

        if ctx.input(|i| i.key_pressed(egui::Key::Q)) {
            log::info!("'q' pressed, stopping after the current frame");
            self.stop.request_stop();
        }
        if self.feed.is_finished() {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            match &self.texture {
                Some(texture) => {
                    ui.add(
                        egui::Image::new(egui::load::SizedTexture::from_handle(texture))
                            .shrink_to_fit(),
                    );
                }
                None => {
                    ui.label("Waiting for the first frame...");
                }
            }
            ui.label(format!("frame {}  (press q to quit)", self.tick));
        });

        ctx.request_repaint_after(REPAINT_INTERVAL);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        // closing the window ends the session like `q`
        self.stop.request_stop();
    }
}

/// Show `feed` until the session ends or the window is closed. Blocks the
/// calling thread, which must be the main thread.
pub fn run_preview_window(feed: Arc<LiveFeed>, stop: StopToken, title: &str) -> Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([800.0, 600.0])
            .with_title(title),
        ..Default::default()
    };
    eframe::run_native(
        title,
        options,
        Box::new(move |_cc| Box::new(PreviewWindow::new(feed, stop))),
    )
    .map_err(|e| anyhow::anyhow!("preview window failed: {}", e))
}
