use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use health_common::backend::BackendClient;

use health_assistant::cli::{Command, HELP};
use health_assistant::config::Config;
use health_assistant::doctors::DoctorSearch;
use health_assistant::model::{common_symptom, Visibility, COMMON_SYMPTOMS};
use health_assistant::render::Renderer;
use health_assistant::session::ChatSession;
use health_assistant::symptoms::SymptomChecker;
use health_assistant::transport::{FixedGeocoder, HttpBackend};

struct App {
    chat: ChatSession,
    checker: SymptomChecker,
    doctors: DoctorSearch,
    backend: Arc<HttpBackend>,
    removed: Arc<AtomicBool>,
    renderer: Renderer,
}

impl App {
    /// Returns `false` when the user asked to quit.
    async fn handle(&self, command: Command) -> bool {
        match command {
            Command::Quit => return false,
            Command::Help => println!("{HELP}"),
            Command::Open | Command::Minimize | Command::Close | Command::Remove | Command::Reset
                if self.removed.load(Ordering::SeqCst) =>
            {
                println!("The assistant has been removed from this session.");
            }
            Command::Open => {
                self.chat.open().await;
                self.show_chat().await;
            }
            Command::Minimize => {
                self.chat.toggle_minimize().await;
                self.show_chat_status().await;
            }
            Command::Close => {
                self.chat.close().await;
                self.show_chat_status().await;
            }
            Command::Remove => {
                self.chat.remove().await;
                println!("Health assistant removed.");
            }
            Command::Reset => {
                if !self.chat.reset().await {
                    println!("Nothing to reset yet.");
                }
                self.show_chat().await;
            }
            Command::Chat(text) => self.chat_turn(&text).await,
            Command::Analyze(text) => {
                if let Some(text) = text {
                    self.checker.set_description(&text).await;
                }
                self.checker.analyze().await;
                self.show_analysis().await;
            }
            Command::Symptom(name) => match common_symptom(&name) {
                Some(symptom) => {
                    if !self.checker.select(symptom).await {
                        println!("{} is already selected.", symptom.name);
                    }
                    self.show_selection().await;
                }
                None => println!("{}", self.renderer.banner(&format!("unknown symptom: {name}"))),
            },
            Command::Symptoms => self.show_selection().await,
            Command::Location(address) => {
                self.doctors.locate(&address).await;
                self.show_search().await;
            }
            Command::Here(coordinates) => {
                self.doctors.use_position(coordinates).await;
                self.show_search().await;
            }
            Command::Specialty(specialty) => {
                self.doctors.set_specialty(&specialty).await;
                self.show_search().await;
            }
            Command::Radius(radius) => {
                self.doctors.set_radius(radius).await;
                self.show_search().await;
            }
            Command::ClearFilters => {
                self.doctors.clear_filters().await;
                self.show_search().await;
            }
            Command::Select(position) => match self.doctors.select(position).await {
                Some(doctor) => println!("{}", self.renderer.doctor(&doctor)),
                None => println!("No doctor at position {}.", position + 1),
            },
            Command::Specialties => {
                let specialties = self.doctors.specialties().await;
                if specialties.is_empty() {
                    println!("No specialties loaded.");
                } else {
                    println!("All Specialties, {}", specialties.join(", "));
                }
            }
            Command::Status => {
                for (service, result) in self.backend.check_all().await {
                    match result {
                        Ok(()) => println!("{}: ok", service.name()),
                        Err(e) => println!("{}: {e}", service.name()),
                    }
                }
            }
        }
        true
    }

    async fn chat_turn(&self, text: &str) {
        if self.removed.load(Ordering::SeqCst) {
            println!("The assistant has been removed from this session.");
            return;
        }
        if self.chat.snapshot().await.visibility != Visibility::Expanded {
            println!("Open the chat with /open first.");
            return;
        }
        self.chat.send(text).await;
        self.show_chat().await;
    }

    async fn show_chat(&self) {
        let state = self.chat.snapshot().await;
        if state.visibility == Visibility::Expanded {
            println!("{}", self.renderer.transcript(&state));
        } else {
            println!("({})", self.renderer.widget_status(&state));
        }
    }

    async fn show_chat_status(&self) {
        let state = self.chat.snapshot().await;
        println!("({})", self.renderer.widget_status(&state));
    }

    async fn show_analysis(&self) {
        if let Some(error) = self.checker.last_error().await {
            println!("{}", self.renderer.banner(&error));
        }
        if let Some(view) = self.checker.result().await {
            println!("{}", self.renderer.analysis(&view));
        }
    }

    async fn show_selection(&self) {
        let selected = self.checker.selected().await;
        for symptom in COMMON_SYMPTOMS {
            let chosen = selected.iter().any(|s| s.id == symptom.id);
            let mark = if chosen { "x" } else { " " };
            println!("[{mark}] {} ({:?})", symptom.name, symptom.severity);
        }
    }

    async fn show_search(&self) {
        if let Some(error) = self.doctors.last_error().await {
            println!("{}", self.renderer.banner(&error));
        }
        let query = self.doctors.query().await;
        if let Some(location) = &query.location {
            println!(
                "Near {} within {} km, {}",
                location
                    .label
                    .clone()
                    .unwrap_or_else(|| location.coordinates.to_query_value()),
                query.radius_km,
                query.specialty.as_deref().unwrap_or("All Specialties"),
            );
        }
        if let Some(results) = self.renderer.search_results(&self.doctors.results().await) {
            println!("{results}");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting health assistant");

    let config = Config::from_env()?;
    info!(
        analyzer = %config.backend.analyzer_base_url,
        chat = %config.backend.chat_base_url,
        doctors = %config.backend.doctors_base_url,
        timeout_ms = config.backend.timeout.as_millis(),
        "backend configured"
    );
    let client = BackendClient::new(config.backend.clone())?;
    let backend = Arc::new(HttpBackend::new(client, config.api_key.clone()));

    let removed = Arc::new(AtomicBool::new(false));
    let removed_flag = removed.clone();
    let chat = ChatSession::new(backend.clone())
        .with_remove_hook(move || removed_flag.store(true, Ordering::SeqCst));

    let app = App {
        chat,
        checker: SymptomChecker::new(backend.clone()),
        doctors: DoctorSearch::new(backend.clone(), Arc::new(FixedGeocoder::default()))
            .with_select_hook(|doctor| println!("Selected {}", doctor.name)),
        backend,
        removed,
        renderer: Renderer::new(config.color),
    };
    app.doctors.load_specialties().await;

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match Command::parse(&line) {
            Ok(Some(command)) => {
                if !app.handle(command).await {
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "rejected input");
                println!("{}", app.renderer.banner(&e.to_string()));
            }
        }
    }

    info!("health assistant shut down");
    Ok(())
}
