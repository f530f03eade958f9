use clap::{Parser, Subcommand};
use log::{info, warn};
use roof_takeoff::{
    config::{read_config_json, write_config_json},
    host::{HostSink, JsonLinesSink, NullSink},
    io::{read_report, read_to_string},
    measurement::SummaryKind,
    LineType, ReportModel, SelectionController, ViewerConfig,
};
use std::rc::Rc;

/// Roof measurement takeoff from vendor XML exports.
#[derive(Parser)]
#[command(name = "roof_takeoff_cli", version)]
struct Cli {
    /// Viewer configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the measurement summary of a set of faces.
    Summary {
        path: String,
        /// Face id to select; repeat for several faces.
        #[arg(long = "face")]
        faces: Vec<String>,
        /// Select every face with a usable outline.
        #[arg(long)]
        all: bool,
        /// Print the host record as JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// List the faces of a report.
    Faces { path: String },
    /// List the faces under a screen position of the fitted view.
    Hit {
        path: String,
        sx: f64,
        sy: f64,
        #[arg(long)]
        width: Option<f64>,
        #[arg(long)]
        height: Option<f64>,
    },
    /// Replay a pointer event script and print host records as JSON lines.
    Replay { path: String, events: String },
    /// Write the default viewer configuration.
    ConfigInit { path: String },
}

/// One line of a replay script.
#[derive(Debug, Clone, PartialEq)]
enum ReplayEvent {
    Down(f64, f64),
    Move(f64, f64),
    Up(f64, f64),
    Leave,
    Wheel { dx: f64, dy: f64, ctrl: bool },
    SelectAll,
    SelectType(LineType),
    Highlight(LineType),
    Resolve(String),
    Dismiss,
    ZoomIn,
    ZoomOut,
    Reset,
    Resize(f64, f64),
}

fn number(token: Option<&String>, what: &str) -> Result<f64, String> {
    let token = token.ok_or_else(|| format!("missing {}", what))?;
    token
        .parse::<f64>()
        .map_err(|_| format!("invalid {} '{}'", what, token))
}

fn line_type(token: Option<&String>) -> Result<LineType, String> {
    token
        .map(|t| LineType::from_token(t))
        .ok_or_else(|| "missing line type".to_string())
}

impl ReplayEvent {
    fn parse(tokens: &[String]) -> Result<Self, String> {
        let (name, args) = tokens
            .split_first()
            .ok_or_else(|| "empty event".to_string())?;
        let event = match name.as_str() {
            "down" => Self::Down(number(args.first(), "x")?, number(args.get(1), "y")?),
            "move" => Self::Move(number(args.first(), "x")?, number(args.get(1), "y")?),
            "up" => Self::Up(number(args.first(), "x")?, number(args.get(1), "y")?),
            "leave" => Self::Leave,
            "wheel" => Self::Wheel {
                dx: number(args.first(), "dx")?,
                dy: number(args.get(1), "dy")?,
                ctrl: args.get(2).is_some_and(|t| t == "ctrl"),
            },
            "select-all" => Self::SelectAll,
            "select-type" => Self::SelectType(line_type(args.first())?),
            "highlight" => Self::Highlight(line_type(args.first())?),
            "resolve" => Self::Resolve(
                args.first()
                    .cloned()
                    .ok_or_else(|| "missing face id".to_string())?,
            ),
            "dismiss" => Self::Dismiss,
            "zoom-in" => Self::ZoomIn,
            "zoom-out" => Self::ZoomOut,
            "reset" => Self::Reset,
            "resize" => Self::Resize(
                number(args.first(), "width")?,
                number(args.get(1), "height")?,
            ),
            other => return Err(format!("unknown event '{}'", other)),
        };
        Ok(event)
    }

    fn apply<S: HostSink>(&self, controller: &mut SelectionController<S>) {
        match self {
            Self::Down(x, y) => controller.pointer_down(*x, *y),
            Self::Move(x, y) => controller.pointer_move(*x, *y),
            Self::Up(x, y) => controller.pointer_up(*x, *y),
            Self::Leave => controller.pointer_leave(),
            Self::Wheel { dx, dy, ctrl } => {
                let (width, height) = controller.viewport();
                controller.wheel(*dx, *dy, *ctrl, width / 2.0, height / 2.0)
            }
            Self::SelectAll => controller.toggle_select_all(),
            Self::SelectType(t) => controller.select_by_line_type(*t),
            Self::Highlight(t) => controller.toggle_highlighted_type(*t),
            Self::Resolve(id) => {
                if !controller.resolve_disambiguation(id) {
                    warn!("face {} was not offered", id);
                }
            }
            Self::Dismiss => controller.dismiss_disambiguation(),
            Self::ZoomIn => controller.zoom_in(),
            Self::ZoomOut => controller.zoom_out(),
            Self::Reset => controller.reset_view(),
            Self::Resize(w, h) => controller.resize(*w, *h),
        }
    }
}

/// Parses a replay script. Blank lines and `#` comments are skipped.
fn parse_script(script: &str) -> Result<Vec<ReplayEvent>, String> {
    let mut events = Vec::new();
    for (idx, line) in script.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let tokens = shell_words::split(line).map_err(|e| format!("line {}: {}", idx + 1, e))?;
        let event = ReplayEvent::parse(&tokens).map_err(|e| format!("line {}: {}", idx + 1, e))?;
        events.push(event);
    }
    Ok(events)
}

fn load_config(path: Option<&str>) -> ViewerConfig {
    match path {
        Some(path) => match read_config_json(path) {
            Ok(config) => config,
            Err(e) => fail(format!("Error reading {}: {}", path, e)),
        },
        None => ViewerConfig::default(),
    }
}

fn load_model(path: &str) -> Rc<ReportModel> {
    match read_report(path) {
        Ok(model) => Rc::new(model),
        Err(e) => fail(format!("Error reading {}: {}", path, e)),
    }
}

fn fail(message: String) -> ! {
    eprintln!("{}", message);
    std::process::exit(1);
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());
    match cli.command {
        Commands::Summary {
            path,
            faces,
            all,
            json,
        } => {
            let model = load_model(&path);
            let mut controller = SelectionController::new(model, config, NullSink);
            if all {
                controller.select_all();
            }
            for id in &faces {
                if !controller.is_selected(id) && !controller.toggle_face(id) {
                    eprintln!("Face {} cannot be selected", id);
                }
            }
            if json {
                match serde_json::to_string_pretty(&controller.host_record()) {
                    Ok(text) => println!("{}", text),
                    Err(e) => fail(format!("Error encoding record: {}", e)),
                }
            } else if controller.summary().is_empty() {
                println!("No faces selected");
            } else {
                for item in controller.summary() {
                    match item.kind {
                        SummaryKind::Pitch => {
                            println!("{}: {} {}", item.name, item.length, item.unit)
                        }
                        _ => println!("{}: {:.2} {}", item.name, item.length, item.unit),
                    }
                }
            }
        }
        Commands::Faces { path } => {
            let model = load_model(&path);
            for face in model.faces.values() {
                let pitch = face
                    .pitch
                    .map(|p| format!("{}/12", p))
                    .unwrap_or_else(|| "-".to_string());
                let area = face
                    .area
                    .map(|a| format!("{:.2}", a))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{}\t{}\tpitch {}\tarea {}\t{} vertices{}",
                    face.id,
                    face.display_label(),
                    pitch,
                    area,
                    face.vertices.len(),
                    if face.partial_loop { "\tpartial" } else { "" }
                );
            }
        }
        Commands::Hit {
            path,
            sx,
            sy,
            width,
            height,
        } => {
            let model = load_model(&path);
            let width = width.unwrap_or(config.viewport_width);
            let height = height.unwrap_or(config.viewport_height);
            let mut controller = SelectionController::new(model, config, NullSink);
            controller.resize(width, height);
            let hits = controller.hit_test(sx, sy);
            if hits.is_empty() {
                println!("No faces at ({}, {})", sx, sy);
            }
            for id in hits {
                let label = controller
                    .model()
                    .faces
                    .get(&id)
                    .map(|f| f.display_label())
                    .unwrap_or_default();
                println!("{}\t{}", id, label);
            }
        }
        Commands::Replay { path, events } => {
            let model = load_model(&path);
            let script = match read_to_string(&events) {
                Ok(script) => script,
                Err(e) => fail(format!("Error reading {}: {}", events, e)),
            };
            let events = match parse_script(&script) {
                Ok(events) => events,
                Err(e) => fail(format!("Error in {}", e)),
            };
            let sink = JsonLinesSink::new(std::io::stdout());
            let mut controller = SelectionController::new(model, config, sink);
            for event in &events {
                event.apply(&mut controller);
            }
            info!(
                "replayed {} events, selection revision {}",
                events.len(),
                controller.revision()
            );
        }
        Commands::ConfigInit { path } => match write_config_json(&path, &ViewerConfig::default()) {
            Ok(()) => println!("Wrote configuration to {}", path),
            Err(e) => fail(format!("Error writing {}: {}", path, e)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_parsing() {
        let events = parse_script(concat!(
            "# pan then pick\n",
            "down 10 20\n",
            "move 30 20\n",
            "\n",
            "up 30 20\n",
            "wheel 0 -120 ctrl\n",
            "resolve \"Face 2\"\n",
            "select-type rake\n",
        ))
        .unwrap();
        assert_eq!(
            events,
            vec![
                ReplayEvent::Down(10.0, 20.0),
                ReplayEvent::Move(30.0, 20.0),
                ReplayEvent::Up(30.0, 20.0),
                ReplayEvent::Wheel {
                    dx: 0.0,
                    dy: -120.0,
                    ctrl: true
                },
                ReplayEvent::Resolve("Face 2".to_string()),
                ReplayEvent::SelectType(LineType::Rake),
            ]
        );
    }

    #[test]
    fn script_errors_name_the_line() {
        let err = parse_script("down 1 2\nup 1\n").unwrap_err();
        assert!(err.starts_with("line 2"));
        let err = parse_script("jump 1 2").unwrap_err();
        assert!(err.contains("unknown event 'jump'"));
    }
}
