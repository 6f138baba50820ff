//! Smart-Dictation: push-to-talk speech-to-text with global hotkeys.

mod app;
mod config;
mod error;
mod fn_key;
mod hotkey_handler;
mod main_thread_command;
mod output_handler;
mod paste_modifier_guard;
mod volume_control;

pub(crate) use {
    app::App,
    error::{AppError, Result as AppResult},
    fn_key::FnKeyProbe,
    hotkey_handler::HotkeyHandler,
    main_thread_command::MainThreadCommand,
    output_handler::{ClipboardSink, OutputHandler},
    paste_modifier_guard::PasteModifierGuard,
    volume_control::AppleScriptVolume,
};

use crate::config::Config;

use smart_dictation_core::{
    HotkeyBinding, SensorKey, SensorPoller, WhisperTranscriber, hotkey_signal,
};

use tao::{
    event::{Event, StartCause},
    event_loop::{ControlFlow, EventLoopBuilder, EventLoopProxy},
};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Log filter used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "smart_dictation=debug,smart_dictation_core=debug";

/// Hotkey listeners that must stay alive on the main thread.
struct Listeners {
    _hotkeys: HotkeyHandler,
    _pollers: Vec<SensorPoller>,
}

/// Application entry point.
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let event_loop = EventLoopBuilder::<MainThreadCommand>::with_user_event().build();
    let proxy = event_loop.create_proxy();

    // Dropping these unregisters the hotkeys and stops the pollers.
    let mut listeners: Option<Listeners> = None;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Wait;

        match event {
            Event::UserEvent(MainThreadCommand::Shutdown) => {
                info!("Exiting");
                drop(listeners.take());
                *control_flow = ControlFlow::ExitWithCode(0);
            }
            Event::UserEvent(MainThreadCommand::Fatal) => {
                drop(listeners.take());
                *control_flow = ControlFlow::ExitWithCode(1);
            }
            Event::NewEvents(StartCause::Init) => match start(proxy.clone()) {
                Ok(started) => {
                    if listeners.replace(started).is_some() {
                        warn!("Listeners started twice, replaced the earlier set");
                    }

                    #[cfg(target_os = "macos")]
                    unsafe {
                        use core_foundation::runloop::{CFRunLoopGetMain, CFRunLoopWakeUp};
                        CFRunLoopWakeUp(CFRunLoopGetMain());
                    }
                }
                Err(e) => {
                    error!(error = ?e, "Startup failed");
                    std::process::exit(1);
                }
            },
            _ => {}
        }
    });
}

/// Load config, register listeners on this thread, and start the runtime
/// thread that runs the dictation loops.
fn start(proxy: EventLoopProxy<MainThreadCommand>) -> AppResult<Listeners> {
    let config = Config::load()?;
    config.validate()?;
    config.validate_model_path()?;

    let transcriber = WhisperTranscriber::new(&config.whisper.model_path, config.whisper.settings())?;
    let sink = ClipboardSink::new(OutputHandler::new()?, config.behavior.auto_paste);

    // Registration happens on the main thread: tao's event loop pumps the
    // messages global hotkey delivery needs.
    let mut hotkeys = HotkeyHandler::new()?;
    let mut pollers = Vec::new();
    let mut sources = Vec::new();

    for binding in config.hotkeys.parsed() {
        let (trigger, source) = hotkey_signal(binding.clone());

        match binding {
            HotkeyBinding::Combo { .. } => hotkeys.register(trigger)?,
            HotkeyBinding::Sensor(SensorKey::Fn) => {
                if !cfg!(target_os = "macos") {
                    warn!("The fn key can only be detected on macOS");
                }
                pollers.push(SensorPoller::spawn(
                    FnKeyProbe::new(),
                    config.hotkeys.poll_interval(),
                    trigger,
                )?);
            }
        }

        sources.push(source);
    }

    if !hotkeys.is_empty() {
        hotkeys.spawn_listener()?;
    }

    let app = App::new(&config, sources, transcriber, sink);

    // Detached; it reports back through the proxy when it ends.
    let _runtime_thread = std::thread::Builder::new()
        .name("dictation-runtime".to_string())
        .spawn(move || run_runtime(app, proxy))?;

    Ok(Listeners {
        _hotkeys: hotkeys,
        _pollers: pollers,
    })
}

/// Coordination context: a single-threaded runtime hosting every
/// dictation loop. Whisper inference runs on its blocking pool.
fn run_runtime(app: App, proxy: EventLoopProxy<MainThreadCommand>) {
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = ?e, "Failed to create tokio runtime");
            let _ = proxy.send_event(MainThreadCommand::Fatal);
            return;
        }
    };

    rt.block_on(async {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Interrupt received, shutting down");
                    let _ = shutdown_tx.send(true);
                }
                Err(e) => {
                    error!(error = ?e, "Failed to listen for interrupt");
                    // Closing the sender would stop the loops.
                    let _keep = shutdown_tx;
                    std::future::pending::<()>().await;
                }
            }
        });

        if let Err(e) = app.run(shutdown_rx).await {
            error!(error = ?e, "App error");
        }
    });

    let _ = proxy.send_event(MainThreadCommand::Shutdown);
}
