use std::sync::Arc;
use std::thread::{JoinHandle, ThreadId};

use crossbeam_channel::{Receiver, Sender};

use crate::foundation::error::{BreathcastError, BreathcastResult};
use crate::render::backend::{FrameRGBA, FrameRenderer, FrameRequest, RenderParams};

/// Closure dispatched onto the UI context.
pub type UiCall = Box<dyn FnOnce() + Send + 'static>;

enum UiJob {
    Render {
        request: FrameRequest,
        params: Arc<RenderParams>,
        reply: Sender<BreathcastResult<FrameRGBA>>,
    },
    Call(UiCall),
}

struct UiShared {
    thread_id: ThreadId,
    handle: Option<JoinHandle<()>>,
}

/// Handle to the UI-affine thread.
///
/// The thread owns the [`FrameRenderer`]; all rendering and every completion callback run
/// there, one job at a time, in submission order. Clones share the same thread, which exits once
/// every handle is dropped (or [`UiContext::shutdown`] is called) and its queue drains.
#[derive(Clone)]
pub struct UiContext {
    tx: Sender<UiJob>,
    shared: Arc<UiShared>,
}

impl std::fmt::Debug for UiContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiContext")
            .field("thread_id", &self.shared.thread_id)
            .finish_non_exhaustive()
    }
}

impl UiContext {
    /// Start the UI thread and build the renderer on it.
    ///
    /// `make_renderer` runs on the new thread, so the renderer itself need not be `Send`.
    pub fn spawn<R, F>(make_renderer: F) -> BreathcastResult<Self>
    where
        R: FrameRenderer + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        let (tx, rx) = crossbeam_channel::unbounded::<UiJob>();
        let handle = std::thread::Builder::new()
            .name("breathcast-ui".to_string())
            .spawn(move || {
                let mut renderer = make_renderer();
                run_jobs(&mut renderer, &rx);
            })
            .map_err(|e| anyhow::anyhow!("spawn ui thread: {e}"))?;

        Ok(Self {
            tx,
            shared: Arc::new(UiShared {
                thread_id: handle.thread().id(),
                handle: Some(handle),
            }),
        })
    }

    /// Whether the calling thread is the UI thread.
    pub fn is_current(&self) -> bool {
        std::thread::current().id() == self.shared.thread_id
    }

    /// Render one frame on the UI thread and wait for the result.
    pub fn render(
        &self,
        request: FrameRequest,
        params: Arc<RenderParams>,
    ) -> BreathcastResult<FrameRGBA> {
        if self.is_current() {
            return Err(BreathcastError::frame_render(
                "synchronous render requested from the ui thread itself",
            ));
        }
        let (reply, result) = crossbeam_channel::bounded(1);
        self.tx
            .send(UiJob::Render {
                request,
                params,
                reply,
            })
            .map_err(|_| BreathcastError::frame_render("ui context has shut down"))?;
        result
            .recv()
            .map_err(|_| BreathcastError::frame_render("ui context dropped the render request"))?
    }

    /// Queue `call` on the UI thread without waiting.
    ///
    /// Gives the closure back when the UI thread is gone so the caller can still run it.
    pub fn dispatch(&self, call: UiCall) -> Result<(), UiCall> {
        self.tx.send(UiJob::Call(call)).map_err(|e| match e.0 {
            UiJob::Call(call) => call,
            UiJob::Render { .. } => Box::new(|| {}) as UiCall,
        })
    }

    /// Stop accepting work from this handle and wait for the UI thread to drain its queue.
    ///
    /// Only joins when this is the last handle; other clones keep the thread alive.
    pub fn shutdown(self) {
        let Self { tx, shared } = self;
        drop(tx);
        if shared.thread_id == std::thread::current().id() {
            return;
        }
        if let Ok(UiShared {
            handle: Some(handle),
            ..
        }) = Arc::try_unwrap(shared)
            && handle.join().is_err()
        {
            tracing::warn!("ui thread panicked");
        }
    }
}

fn run_jobs<R: FrameRenderer>(renderer: &mut R, rx: &Receiver<UiJob>) {
    for job in rx.iter() {
        match job {
            UiJob::Render {
                request,
                params,
                reply,
            } => {
                let out = renderer.render(&request, &params);
                // The requester may have given up; nothing to report then.
                let _ = reply.send(out);
            }
            UiJob::Call(call) => call(),
        }
    }
    tracing::debug!("ui thread exiting");
}

#[cfg(test)]
#[path = "../../tests/unit/record/ui.rs"]
mod tests;
