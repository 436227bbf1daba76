use super::ViewportHost;

/// A host that records how the scene used it.
#[derive(Debug, Default)]
pub struct RecordingHost {
    pub size: (u32, u32),
    pub subscribed: bool,
    pub pending_resize: Option<(u32, u32)>,
    pub frame_requests: usize,
    pub attached: bool,
    pub attach_calls: usize,
    pub detach_calls: usize,
    pub unsubscribe_calls: usize,
}

impl RecordingHost {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: (width, height),
            ..Default::default()
        }
    }

    /// Simulate the user resizing the host. Only queued while subscribed.
    pub fn user_resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);

        if self.subscribed {
            self.pending_resize = Some((width, height));
        }
    }
}

impl ViewportHost for RecordingHost {
    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn subscribe_resize(&mut self) {
        self.subscribed = true;
    }

    fn unsubscribe_resize(&mut self) {
        self.subscribed = false;
        self.pending_resize = None;
        self.unsubscribe_calls += 1;
    }

    fn take_resize(&mut self) -> Option<(u32, u32)> {
        self.pending_resize.take()
    }

    fn request_frame(&mut self) {
        self.frame_requests += 1;
    }

    fn attach_surface(&mut self) {
        self.attached = true;
        self.attach_calls += 1;
    }

    fn detach_surface(&mut self) {
        self.attached = false;
        self.detach_calls += 1;
    }
}
