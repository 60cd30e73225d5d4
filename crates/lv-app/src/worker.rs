use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread::{self, JoinHandle};

use image::imageops::{self, FilterType};
use lv_core::error::Result;
use lv_core::{ProgressEvent, ProgressSink};

pub enum WorkerCommand {
    Preview(ProgressEvent),
    Shutdown,
}

pub enum WorkerResponse {
    Saved { index: usize, path: PathBuf },
    Progress(f32),
    Error(String),
}

/// Writes previews to disk off the sampling thread
pub struct PreviewWorker {
    command_tx: Sender<WorkerCommand>,
    response_rx: Receiver<WorkerResponse>,
    thread_handle: Option<JoinHandle<()>>,
}

impl PreviewWorker {
    /// Create `output_dir` if needed and start the writer thread
    pub fn new(output_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&output_dir)?;

        let (cmd_tx, cmd_rx) = channel::<WorkerCommand>();
        let (resp_tx, resp_rx) = channel::<WorkerResponse>();

        let thread_handle = thread::spawn(move || {
            let mut index = 0;

            // Worker loop
            loop {
                match cmd_rx.recv() {
                    Ok(WorkerCommand::Preview(event)) => {
                        index += 1;

                        if let Some(progress) = event.percentage {
                            let _ = resp_tx.send(WorkerResponse::Progress(progress));
                        }

                        match save_preview(&output_dir, index, &event) {
                            Ok(Some(path)) => {
                                let _ = resp_tx.send(WorkerResponse::Saved { index, path });
                            }
                            Ok(None) => {}
                            Err(e) => {
                                let _ = resp_tx.send(WorkerResponse::Error(
                                    format!("Failed to save preview {}: {}", index, e)
                                ));
                            }
                        }
                    }

                    Ok(WorkerCommand::Shutdown) => {
                        break;
                    }

                    Err(_) => {
                        break;
                    }
                }
            }
        });

        Ok(Self {
            command_tx: cmd_tx,
            response_rx: resp_rx,
            thread_handle: Some(thread_handle),
        })
    }

    /// Emitter feeding this worker, for the step callback
    pub fn sink(&self) -> PreviewSink {
        PreviewSink {
            command_tx: self.command_tx.clone(),
        }
    }

    pub fn try_recv_response(&self) -> Option<WorkerResponse> {
        self.response_rx.try_recv().ok()
    }

    /// Finish queued previews and stop the thread
    pub fn shutdown(&mut self) {
        let _ = self.command_tx.send(WorkerCommand::Shutdown);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for PreviewWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

pub struct PreviewSink {
    command_tx: Sender<WorkerCommand>,
}

impl ProgressSink for PreviewSink {
    fn emit(&mut self, event: ProgressEvent) {
        if self.command_tx.send(WorkerCommand::Preview(event)).is_err() {
            log::warn!("Preview worker stopped; dropping event");
        }
    }
}

/// Upscale the preview to its display size and write it as PNG
fn save_preview(dir: &Path, index: usize, event: &ProgressEvent) -> Result<Option<PathBuf>> {
    let Some(image) = &event.preview_image else {
        return Ok(None);
    };

    let (width, height) = event
        .display_dimensions
        .unwrap_or((image.width(), image.height()));
    let upscaled = imageops::resize(image, width, height, FilterType::Nearest);

    let path = dir.join(format!("step_{:04}.png", index));
    upscaled.save(&path)?;

    Ok(Some(path))
}
