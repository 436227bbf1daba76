use tracing::{info, warn};
use winit::{platform::web::WindowExtWebSys, window::Window};

/// Id of the page element the render canvas is placed in.
const CONTAINER_ID: &str = "wasm-container";

pub fn logging_init() {
    console_error_panic_hook::set_once();
    tracing_wasm::set_as_global_default();
}

/// Add the window's canvas to the page container.
pub fn attach_canvas(window: &Window, width: u32, height: u32) {
    // Winit prevents sizing with CSS so the size has to be manually specified.
    info!("requesting canvas size of {width} x {height}");

    use winit::dpi::PhysicalSize;
    let _ = window.request_inner_size(PhysicalSize::new(width, height));

    let attached = web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| {
            let element = d.get_element_by_id(CONTAINER_ID)?;
            let canvas = web_sys::Element::from(window.canvas()?);
            element.append_child(&canvas).ok()?;
            Some(())
        });

    if attached.is_none() {
        warn!("failed to append canvas to the #{CONTAINER_ID} element");
    }
}

/// Take the window's canvas back out of the page.
pub fn remove_canvas(window: &Window) {
    match window.canvas() {
        Some(canvas) => web_sys::Element::from(canvas).remove(),
        None => warn!("window has no canvas to remove"),
    }
}
