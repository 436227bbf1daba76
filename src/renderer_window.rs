use std::sync::Arc;

use tracing::debug;
use winit::{dpi::PhysicalSize, window::Window};

use crate::viewport::ViewportHost;

/// Hosts a scene in a winit window.
///
/// Natively the window is shown when the surface is attached and hidden when
/// it is detached. On the web the window's canvas is added to and removed
/// from the page's `wasm-container` element instead.
pub struct WindowHost {
    window: Arc<Window>,
    /// Size requested for the canvas when it is added to the page.
    #[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
    requested_size: PhysicalSize<u32>,
    resize_subscribed: bool,
    pending_resize: Option<(u32, u32)>,
}

impl WindowHost {
    pub fn new(window: Arc<Window>, requested_size: PhysicalSize<u32>) -> Self {
        Self {
            window,
            requested_size,
            resize_subscribed: false,
            pending_resize: None,
        }
    }

    /// Called from the event loop when the window changes size. Dropped unless
    /// a scene is subscribed.
    pub fn notify_resized(&mut self, size: PhysicalSize<u32>) {
        if self.resize_subscribed {
            self.pending_resize = Some((size.width, size.height));
            self.window.request_redraw();
        } else {
            debug!("window resized with no subscriber");
        }
    }
}

impl ViewportHost for WindowHost {
    fn size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }

    fn subscribe_resize(&mut self) {
        self.resize_subscribed = true;
    }

    fn unsubscribe_resize(&mut self) {
        self.resize_subscribed = false;
        self.pending_resize = None;
    }

    fn take_resize(&mut self) -> Option<(u32, u32)> {
        self.pending_resize.take()
    }

    fn request_frame(&mut self) {
        self.window.request_redraw();
    }

    fn attach_surface(&mut self) {
        cfg_if::cfg_if! {
            if #[cfg(target_arch = "wasm32")] {
                crate::wasm_support::attach_canvas(
                    &self.window,
                    self.requested_size.width,
                    self.requested_size.height,
                );
            } else {
                self.window.set_visible(true);
            }
        }
    }

    fn detach_surface(&mut self) {
        cfg_if::cfg_if! {
            if #[cfg(target_arch = "wasm32")] {
                crate::wasm_support::remove_canvas(&self.window);
            } else {
                self.window.set_visible(false);
            }
        }
    }
}
