pub mod animation;
pub mod camera;
pub mod config;
pub mod content;
pub mod lifecycle;
pub mod lighting;
pub mod math_utils;
pub mod platform;
pub mod renderer;
pub mod renderer_window;
pub mod scene;
pub mod viewport;

#[cfg(target_arch = "wasm32")]
mod wasm_support;

use std::sync::Arc;

use tracing::{error, info};
use winit::{
    dpi::PhysicalSize,
    event::*,
    event_loop::EventLoop,
    keyboard::{Key, NamedKey},
    window::WindowBuilder,
};

use config::SceneConfig;
use content::AssetLoader;
use lifecycle::SceneLifecycle;
use platform::{AssetBase, SystemTime};
use renderer::WgpuRenderer;
use renderer_window::WindowHost;
use viewport::ViewportHost;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Open a window and run the underwater scene until the window is closed or
/// Escape is pressed.
pub async fn run() -> anyhow::Result<()> {
    let config = SceneConfig::from_env()?;

    // Create main window for rendering.
    info!("creating main window for rendering");

    let requested_size = PhysicalSize::new(config.window.width, config.window.height);
    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window.title.as_str())
            .with_inner_size(requested_size)
            .with_visible(false)
            .build(&event_loop)?,
    );

    let renderer = WgpuRenderer::new(window.clone()).await?;
    let host = WindowHost::new(window.clone(), requested_size);
    let loader = AssetLoader::new(
        config
            .model
            .asset_base
            .clone()
            .map(AssetBase::new)
            .unwrap_or_else(AssetBase::bundled),
    );

    let mut scene = Some(SceneLifecycle::create(host, renderer, &loader, &config)?);
    let mut last_frame_time = SystemTime::now();

    // Main window event loop.
    info!("starting main window event loop");

    event_loop.run(move |event, control_flow| {
        let Event::WindowEvent { window_id, event } = event else {
            return;
        };

        if window_id != window.id() {
            return;
        }

        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        logical_key: Key::Named(NamedKey::Escape),
                        ..
                    },
                ..
            } => {
                if let Some(mut scene) = scene.take() {
                    scene.teardown();
                }

                control_flow.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Some(scene) = scene.as_mut() {
                    scene.host_mut().notify_resized(new_size);
                }
            }
            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(scene) = scene.as_mut() {
                    let new_size = window.inner_size();
                    scene.host_mut().notify_resized(new_size);
                }
            }
            WindowEvent::RedrawRequested => {
                let now = SystemTime::now();
                let delta = now - last_frame_time;
                last_frame_time = now;

                if let Some(scene) = scene.as_mut() {
                    scene.frame(delta);
                }
            }
            WindowEvent::Occluded(false) => {
                if let Some(scene) = scene.as_mut() {
                    scene.host_mut().request_frame();
                }
            }
            _ => {}
        }
    })?;

    info!("main window event loop finished");
    Ok(())
}

/// Native entry point.
#[cfg(not(target_arch = "wasm32"))]
pub fn underwater_main() {
    if let Err(e) = pollster::block_on(run()) {
        error!("underwater scene failed: {e:?}");
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_support::logging_init();

    wasm_bindgen_futures::spawn_local(async {
        if let Err(e) = run().await {
            error!("underwater scene failed: {e:?}");
        }
    });
}
