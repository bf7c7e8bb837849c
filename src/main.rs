//! x11hwnd - demo entry point
//!
//! Opens a display, creates one captioned window and pumps its messages
//! until the window is closed.

use std::env;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use x11hwnd::backend;
use x11hwnd::window::{WS_CAPTION, WS_MAXIMIZEBOX, WS_MINIMIZEBOX, WS_SYSMENU, WS_THICKFRAME, WS_VISIBLE};
use x11hwnd::{
    CreateParams, EventReader, Message, MessagePump, Msg, NativeEvent, ThreadQueue, Timer,
    WindowId, WindowProc, WindowRegistry, VERSION,
};

fn print_usage() {
    println!("x11hwnd v{}", VERSION);
    println!("Native X11 windows driven by a Win32-style message pump");
    println!();
    println!("Usage: x11hwnd [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -display <name>       X display to connect to (default: $DISPLAY)");
    println!("  -backend <type>       Backend type (x11, null)");
    println!("  -title <text>         Window caption");
    println!("  -geometry <WxH+X+Y>   Window size and optional position");
    println!("  -exit-after <ms>      Quit after this many milliseconds");
    println!("  -list-backends        List available backends");
    println!("  -h, --help            Show this help message");
    println!();
    println!("Examples:");
    println!("  x11hwnd -display :0 -title hello");
    println!("  x11hwnd -backend null -exit-after 100");
    println!();
}

fn list_backends() {
    println!("Available backends on this platform:");
    for backend in backend::available_backends() {
        println!("  - {}", backend);
    }
    println!();
    println!("To build without the X11 backend:");
    println!("  cargo build --no-default-features");
}

#[derive(Debug, Clone, PartialEq)]
struct Geometry {
    width: i32,
    height: i32,
    position: Option<(i32, i32)>,
}

#[derive(Debug)]
struct Config {
    display: Option<String>,
    backend_type: Option<String>,
    title: String,
    geometry: Geometry,
    exit_after: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            display: env::var("DISPLAY").ok(),
            backend_type: None,
            title: "x11hwnd".to_string(),
            geometry: Geometry {
                width: 400,
                height: 300,
                position: None,
            },
            exit_after: None,
        }
    }
}

/// Parse `WxH` with an optional `+X+Y` (either sign) suffix
fn parse_geometry(spec: &str) -> Result<Geometry, String> {
    let invalid = || format!("Invalid geometry: {}", spec);
    let split = spec.find(['+', '-']).unwrap_or(spec.len());
    let (size, offset) = spec.split_at(split);

    let (w, h) = size.split_once('x').ok_or_else(invalid)?;
    let width: i32 = w.parse().map_err(|_| invalid())?;
    let height: i32 = h.parse().map_err(|_| invalid())?;
    if width <= 0 || height <= 0 {
        return Err(invalid());
    }

    let position = if offset.is_empty() {
        None
    } else {
        let rest = &offset[1..];
        let y_at = rest.find(['+', '-']).ok_or_else(invalid)? + 1;
        let x: i32 = offset[..y_at].parse().map_err(|_| invalid())?;
        let y: i32 = offset[y_at..].parse().map_err(|_| invalid())?;
        Some((x, y))
    };

    Ok(Geometry {
        width,
        height,
        position,
    })
}

/// Value following the option at `i`
fn option_value(args: &[String], i: usize) -> Result<&String, String> {
    args.get(i + 1)
        .ok_or_else(|| format!("Missing value for {}", args[i]))
}

fn parse_args() -> Result<Config, String> {
    let mut config = Config::default();
    let args: Vec<String> = env::args().collect();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_usage();
                process::exit(0);
            }
            "-list-backends" => {
                list_backends();
                process::exit(0);
            }
            "-display" => {
                config.display = Some(option_value(&args, i)?.clone());
                i += 1;
            }
            "-backend" => {
                config.backend_type = Some(option_value(&args, i)?.clone());
                i += 1;
            }
            "-title" => {
                config.title = option_value(&args, i)?.clone();
                i += 1;
            }
            "-geometry" => {
                config.geometry = parse_geometry(option_value(&args, i)?)?;
                i += 1;
            }
            "-exit-after" => {
                let ms: u64 = option_value(&args, i)?
                    .parse()
                    .map_err(|_| format!("Invalid delay: {}", args[i + 1]))?;
                config.exit_after = Some(Duration::from_millis(ms));
                i += 1;
            }
            arg => {
                return Err(format!("Unknown option: {}", arg));
            }
        }
        i += 1;
    }

    Ok(config)
}

/// Logs what the window receives and quits once it is closed
struct DemoProc {
    queue: Arc<ThreadQueue>,
}

impl DemoProc {
    fn quit(&self) {
        self.queue.enqueue(NativeEvent::Posted(Message::new(
            WindowId::NONE,
            Msg::QUIT,
            0,
            0,
        )));
    }
}

impl WindowProc for DemoProc {
    fn window_proc(&self, window: WindowId, msg: Msg, wparam: usize, lparam: isize) -> isize {
        match msg.name() {
            Some(name) => log::debug!("{} {} wparam={:#x} lparam={:#x}", window, name, wparam, lparam),
            None => log::debug!("{} {:#06x}", window, msg.0),
        }
        if msg == Msg::CLOSE || msg == Msg::DESTROY {
            self.quit();
        }
        0
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {}", err);
            eprintln!();
            print_usage();
            process::exit(1);
        }
    };

    let backend_type = config.backend_type.clone().unwrap_or_else(|| {
        backend::available_backends()
            .first()
            .map(|b| b.to_string())
            .unwrap_or_else(|| "null".to_string())
    });

    log::info!("x11hwnd v{}", VERSION);
    log::info!("Backend: {}", backend_type);
    if let Some(ref display) = config.display {
        log::info!("Display: {}", display);
    }

    let display = match backend::open(&backend_type, config.display.as_deref()) {
        Ok(display) => display,
        Err(e) => {
            eprintln!("Error: Failed to open display: {}", e);
            process::exit(1);
        }
    };

    let registry = Arc::new(WindowRegistry::new(display));
    let pump = MessagePump::new(registry.clone());
    registry.set_window_proc(Arc::new(DemoProc {
        queue: pump.queue().clone(),
    }));

    let geometry = &config.geometry;
    let (x, y) = geometry
        .position
        .unwrap_or((x11hwnd::window::USE_DEFAULT, x11hwnd::window::USE_DEFAULT));
    let params = CreateParams::new(&config.title)
        .with_bounds(x, y, geometry.width, geometry.height)
        .with_style(
            WS_VISIBLE
                | WS_CAPTION
                | WS_SYSMENU
                | WS_THICKFRAME
                | WS_MINIMIZEBOX
                | WS_MAXIMIZEBOX,
        );
    let id = match registry.create_window(&params) {
        Ok(id) => id,
        Err(e) => {
            eprintln!("Error: Failed to create window: {}", e);
            process::exit(1);
        }
    };
    log::info!("Created window {} \"{}\"", id, config.title);

    let _reader = match EventReader::spawn(registry.clone()) {
        Ok(reader) => reader,
        Err(e) => {
            eprintln!("Error: Failed to start event reader: {}", e);
            process::exit(1);
        }
    };

    let _exit_timer = config.exit_after.map(|delay| {
        let queue = pump.queue().clone();
        let timer = Arc::new(Timer::new(delay, move |timer| {
            log::info!("Exit timer fired");
            timer.set_enabled(false);
            queue.enqueue(NativeEvent::Posted(Message::new(
                WindowId::NONE,
                Msg::QUIT,
                0,
                0,
            )));
        }));
        pump.set_timer(&timer);
        timer
    });

    let code = pump.run();
    if let Err(e) = registry.destroy_window(id) {
        log::warn!("Failed to destroy window {}: {}", id, e);
    }
    log::info!("Message loop finished with code {}", code);
    process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_geometry_size_only() {
        let g = parse_geometry("640x480").unwrap();
        assert_eq!((g.width, g.height, g.position), (640, 480, None));
    }

    #[test]
    fn test_parse_geometry_with_position() {
        let g = parse_geometry("640x480+10-20").unwrap();
        assert_eq!(g.position, Some((10, -20)));
    }

    #[test]
    fn test_parse_geometry_rejects_garbage() {
        assert!(parse_geometry("640").is_err());
        assert!(parse_geometry("0x10").is_err());
        assert!(parse_geometry("10x10+5").is_err());
    }
}
