// Re-export all public modules so they can be used from main.rs
pub mod assets;
pub mod config;
pub mod logging;
pub mod ui;
pub mod utils;

// MVC architecture
pub mod controller;
pub mod model;
pub mod view;

#[cfg(target_arch = "wasm32")]
mod wasm_app {
    use std::cell::RefCell;
    use std::rc::Rc;

    use wasm_bindgen::closure::Closure;
    use wasm_bindgen::{prelude::wasm_bindgen, JsCast, JsValue};
    use web_sys::{Document, Event, HtmlCanvasElement, HtmlElement, KeyboardEvent, MouseEvent, Window};

    use crate::assets;
    use crate::config::SceneConfig;
    use crate::controller::input::wasm as input_events;
    use crate::controller::{
        CameraController, FrameLoopContext, InputEvent, InputProcessor, InputState,
    };
    use crate::logging;
    use crate::model::{Camera, Scene};
    use crate::view::{GpuContext, SceneRenderer};

    #[wasm_bindgen(start)]
    pub async fn start() -> Result<(), JsValue> {
        #[cfg(feature = "console_error_panic_hook")]
        console_error_panic_hook::set_once();

        logging::init();
        let (window, document, canvas) = init_canvas(800, 600)?;
        setup_app(&window, &document, &canvas).await
    }

    /// Main application setup for WASM
    async fn setup_app(
        window: &Window,
        document: &Document,
        canvas: &HtmlCanvasElement,
    ) -> Result<(), JsValue> {
        // The browser build has no filesystem: the scene file and its
        // resources are the ones embedded at compile time.
        let config = SceneConfig::from_toml_str(crate::config::DEFAULT_SCENE)
            .map_err(|e| js_error(format!("scene config error: {e}")))?;
        let resources = assets::embedded_resources(&config)
            .map_err(|e| js_error(format!("resource error: {e}")))?;
        let scene = Scene::from_config(&config, &resources)
            .map_err(|e| js_error(format!("scene error: {e}")))?;
        tracing::info!(objects = scene.objects.len(), "scene ready");

        let gpu = GpuContext::new(canvas, 800, 600)
            .await
            .map_err(|e| js_error(format!("GPU init failed: {e:?}")))?;

        let width = gpu.config.width;
        let height = gpu.config.height;

        let camera = Rc::new(RefCell::new(Camera::new(&config.camera, width, height)));
        let scene = Rc::new(RefCell::new(scene));
        let input_state = Rc::new(RefCell::new(InputState::new()));

        let renderer = SceneRenderer::new(
            gpu.device.as_ref(),
            gpu.queue.as_ref(),
            &gpu.config,
            &scene.borrow(),
            config.lighting.clone(),
            config.fog.clone(),
        );

        let processor = InputProcessor::default();
        setup_input_listeners(document, window, canvas, input_state.clone(), processor.clone())?;

        let frame_ctx = FrameLoopContext::new(
            camera,
            scene,
            input_state,
            processor,
            CameraController::new(&config.controls),
            egui::Context::default(),
            Rc::new(RefCell::new(
                window.performance().map(|p| p.now()).unwrap_or(0.0),
            )),
        );

        // Continuous redraw using requestAnimationFrame
        let f = RcCellCallback::new(window.clone(), {
            let window_for_loop = window.clone();

            move || {
                frame_ctx.update(
                    gpu.device.as_ref(),
                    gpu.queue.as_ref(),
                    &window_for_loop,
                    &gpu.surface,
                    &mut renderer,
                );

                match renderer.draw_frame(gpu.device.as_ref(), gpu.queue.as_ref(), &gpu.surface) {
                    Ok(()) => {}
                    Err(wgpu::SurfaceError::Lost) => {
                        let (w, h) = (renderer.width(), renderer.height());
                        renderer.resize(gpu.device.as_ref(), &gpu.surface, w, h);
                    }
                    Err(e) => tracing::error!("surface error: {e:?}"),
                }
            }
        });
        f.start();

        Ok(())
    }

    /// Wire the DOM event listeners into the shared input state.
    fn setup_input_listeners(
        document: &Document,
        window: &Window,
        canvas: &HtmlCanvasElement,
        input_state: Rc<RefCell<InputState>>,
        processor: InputProcessor,
    ) -> Result<(), JsValue> {
        // Keyboard down
        {
            let input_state = input_state.clone();
            let document_for_exit = document.clone();
            let processor = processor.clone();
            let keydown = Closure::wrap(Box::new(move |e: KeyboardEvent| {
                let key = e.key();

                if processor.is_escape(&key) {
                    document_for_exit.exit_pointer_lock();
                } else if processor.wants_to_toggle_light(&key) {
                    input_state.borrow_mut().toggle_point_light();
                } else if processor.wants_to_toggle_mipmap(&key) {
                    input_state.borrow_mut().toggle_mipmap();
                }

                if processor.is_bound(&key) {
                    e.prevent_default();
                }

                input_state
                    .borrow_mut()
                    .process_event(&input_events::keyboard_event_to_input(&e, true));
            }) as Box<dyn FnMut(KeyboardEvent)>);
            document.add_event_listener_with_callback("keydown", keydown.as_ref().unchecked_ref())?;
            keydown.forget();
        }

        // Keyboard up
        {
            let input_state = input_state.clone();
            let keyup = Closure::wrap(Box::new(move |e: KeyboardEvent| {
                input_state
                    .borrow_mut()
                    .process_event(&input_events::keyboard_event_to_input(&e, false));
            }) as Box<dyn FnMut(KeyboardEvent)>);
            document.add_event_listener_with_callback("keyup", keyup.as_ref().unchecked_ref())?;
            keyup.forget();
        }

        // Focus loss - clear all keys
        {
            let input_state = input_state.clone();
            let blur = Closure::wrap(Box::new(move |_e: Event| {
                input_state.borrow_mut().process_event(&InputEvent::FocusLost);
            }) as Box<dyn FnMut(Event)>);
            window.add_event_listener_with_callback("blur", blur.as_ref().unchecked_ref())?;
            blur.forget();
        }

        // Visibility change - clear all keys
        {
            let input_state = input_state.clone();
            let visibility = Closure::wrap(Box::new(move |_e: Event| {
                input_state
                    .borrow_mut()
                    .process_event(&InputEvent::VisibilityChanged { visible: false });
            }) as Box<dyn FnMut(Event)>);
            document
                .add_event_listener_with_callback("visibilitychange", visibility.as_ref().unchecked_ref())?;
            visibility.forget();
        }

        // Pointer lock change
        {
            let input_state = input_state.clone();
            let doc_pl = document.clone();
            let plc = Closure::wrap(Box::new(move |_e: Event| {
                let locked = doc_pl.pointer_lock_element().is_some();
                input_state
                    .borrow_mut()
                    .process_event(&InputEvent::PointerLockChanged { locked });
            }) as Box<dyn FnMut(Event)>);
            document
                .add_event_listener_with_callback("pointerlockchange", plc.as_ref().unchecked_ref())?;
            plc.forget();
        }

        // Canvas click to enter pointer lock
        {
            let canvas_click = canvas.clone();
            let click = Closure::wrap(Box::new(move |_e: MouseEvent| {
                if let Ok(html_el) = canvas_click.clone().dyn_into::<HtmlElement>() {
                    html_el.request_pointer_lock();
                }
            }) as Box<dyn FnMut(MouseEvent)>);
            canvas.add_event_listener_with_callback("click", click.as_ref().unchecked_ref())?;
            click.forget();
        }

        // Mouse move; the state itself ignores deltas while unlocked
        {
            let input_state = input_state.clone();
            let mm = Closure::wrap(Box::new(move |e: MouseEvent| {
                let event =
                    input_events::mouse_move_to_input(e.movement_x() as f32, e.movement_y() as f32);
                input_state.borrow_mut().process_event(&event);
            }) as Box<dyn FnMut(MouseEvent)>);
            document.add_event_listener_with_callback("mousemove", mm.as_ref().unchecked_ref())?;
            mm.forget();
        }

        Ok(())
    }

    fn init_canvas(width: u32, height: u32) -> Result<(Window, Document, HtmlCanvasElement), JsValue> {
        let window = web_sys::window().ok_or(js_error("no global `window`"))?;
        let document = window.document().ok_or(js_error("no document on window"))?;
        let body = document.body().ok_or(js_error("no body on document"))?;
        let canvas_el = document
            .create_element("canvas")?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| js_error("failed to create canvas"))?;
        canvas_el.set_width(width);
        canvas_el.set_height(height);
        body.append_child(&canvas_el)?;
        Ok((window, document, canvas_el))
    }

    fn js_error<E: Into<String>>(msg: E) -> JsValue {
        JsValue::from_str(&msg.into())
    }

    struct RcCellCallback {
        inner: Rc<RefCell<Box<dyn FnMut()>>>,
        window: Window,
    }

    impl RcCellCallback {
        fn new(window: Window, f: impl FnMut() + 'static) -> Self {
            Self {
                inner: Rc::new(RefCell::new(Box::new(f))),
                window,
            }
        }

        fn start(self) {
            let inner = self.inner.clone();
            let window = self.window.clone();

            let callback = Rc::new(RefCell::new(None::<Closure<dyn FnMut()>>));
            let callback_clone = callback.clone();

            *callback.borrow_mut() = Some(Closure::wrap(Box::new(move || {
                inner.borrow_mut().as_mut()();

                // Recursively schedule next frame
                let cb_ref = callback_clone.borrow();
                window
                    .request_animation_frame(cb_ref.as_ref().unwrap().as_ref().unchecked_ref())
                    .expect("RAF failed");
            }) as Box<dyn FnMut()>));

            self.window
                .request_animation_frame(
                    callback.borrow().as_ref().unwrap().as_ref().unchecked_ref(),
                )
                .expect("RAF start failed");

            // Leak the closure to keep it alive
            std::mem::forget(callback);
        }
    }
}
