use chrono::Local;
use clap::{Parser, Subcommand};
use mediflex_core::analysis::Outcome;
use mediflex_core::gate::{self, Route};
use mediflex_core::render::{self, Theme};
use mediflex_core::*;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "mediflex")]
#[command(about = "Symptom-based medicine recommendations with personalized dosage", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the recommendation service base URL
    #[arg(long, global = true)]
    server: Option<String>,

    /// Only log warnings and errors
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Disable coloured output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the start screen for the current session (default)
    Start,

    /// Create an account and log in
    Register {
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long, default_value = "")]
        email: String,
        #[arg(long, default_value = "")]
        password: String,
    },

    /// Log in with an existing account
    Login {
        #[arg(long, default_value = "")]
        email: String,
        #[arg(long, default_value = "")]
        password: String,
    },

    /// Log out of the current session
    Logout,

    /// Show the logged-in profile
    Profile,

    /// Analyze symptoms and show recommended medicines
    Analyze {
        /// Comma-separated symptoms
        #[arg(default_value = "")]
        symptoms: String,

        /// Add a symptom to the list (repeatable)
        #[arg(long = "add")]
        add: Vec<String>,

        #[arg(long)]
        age: Option<String>,

        #[arg(long)]
        weight: Option<String>,

        /// Comma-separated allergies
        #[arg(long)]
        allergies: Option<String>,

        /// Expand every medicine card
        #[arg(long)]
        expand: bool,

        /// Write a consultation report after a successful analysis
        #[arg(long)]
        export: bool,

        /// Report directory (defaults to [export] output_dir, then the current directory)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Estimate a personalized dosage plan offline
    Estimate {
        /// Medicine name as the service reports it
        #[arg(long)]
        name: Option<String>,

        /// Dosage text, e.g. "500mg every 6 hours"
        #[arg(long)]
        dosage: Option<String>,

        #[arg(long)]
        age: Option<String>,

        #[arg(long)]
        weight: Option<String>,
    },

    /// Render a saved /predict response body
    Render {
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        age: Option<String>,

        #[arg(long)]
        weight: Option<String>,

        #[arg(long)]
        expand: bool,
    },

    /// Export a report from a saved /predict response body
    Export {
        #[arg(long)]
        input: PathBuf,

        /// Symptoms line of the report (defaults to the analyzed symptoms)
        #[arg(long)]
        symptoms: Option<String>,

        #[arg(long)]
        age: Option<String>,

        #[arg(long)]
        weight: Option<String>,

        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Ask the service for dosage guidance
    Dosage {
        medicine: String,

        #[arg(long)]
        age: Option<String>,

        #[arg(long)]
        weight: Option<String>,
    },

    /// Suggest completions for the symptom being typed
    Suggest {
        /// Symptom text so far
        input: String,

        /// Apply the N-th suggestion (1-based) and print the result
        #[arg(long)]
        pick: Option<usize>,
    },

    /// Set a medication reminder
    Remind {
        medicine: String,

        /// Time of day (HH:MM)
        #[arg(long)]
        time: Option<String>,

        /// Times per day
        #[arg(long)]
        frequency: Option<String>,
    },

    /// Show emergency contact numbers
    Contacts,

    /// Toggle dark mode
    Theme,

    /// Show or clear the consultation history
    History {
        #[arg(long)]
        clear: bool,
    },

    /// Show the effective configuration, or write it with --init
    Config {
        #[arg(long)]
        init: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    if cli.quiet {
        mediflex_core::logging::init_with_level("warn");
    } else {
        mediflex_core::logging::init();
    }

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(Config::default_config_path);
    let mut config = Config::load_or_default(&config_path)?;
    if let Some(data_dir) = cli.data_dir.clone() {
        config.data.data_dir = data_dir;
    }
    if let Some(server) = cli.server.clone() {
        config.service.base_url = server;
        config.validate()?;
    }
    tracing::debug!("Data directory: {:?}", config.data.data_dir);

    let prefs = Preferences::load(&config.preferences_path())?;
    let theme = Theme {
        color: !cli.no_color && std::io::stdout().is_terminal(),
        dark: prefs.dark_mode,
    };
    let ctx = Context {
        config,
        theme,
        dark_mode: prefs.dark_mode,
    };

    match cli.command.unwrap_or(Commands::Start) {
        Commands::Start => cmd_start(&ctx),
        Commands::Register {
            name,
            email,
            password,
        } => {
            let store = ctx.credentials()?;
            let outcome = gate::submit_registration(&store, &name, &email, &password)?;
            ctx.show(&outcome.notice);
            Ok(())
        }
        Commands::Login { email, password } => {
            let store = ctx.credentials()?;
            let outcome = gate::submit_login(&store, &email, &password)?;
            ctx.show(&outcome.notice);
            if let Some(name) = outcome.signed_in_as {
                println!("Welcome, {}!", name);
            }
            Ok(())
        }
        Commands::Logout => {
            let store = ctx.credentials()?;
            ctx.show(&gate::sign_out(&store)?);
            Ok(())
        }
        Commands::Profile => cmd_profile(&ctx),
        Commands::Analyze {
            symptoms,
            add,
            age,
            weight,
            allergies,
            expand,
            export,
            out,
        } => {
            let symptoms = add
                .iter()
                .fold(symptoms, |acc, s| mediflex_core::symptoms::add_symptom(&acc, s));
            let patient =
                PatientInputs::new(age.as_deref(), weight.as_deref(), allergies.as_deref());
            cmd_analyze(&ctx, &symptoms, patient, expand, export, out)
        }
        Commands::Estimate {
            name,
            dosage,
            age,
            weight,
        } => {
            let patient = PatientInputs::new(age.as_deref(), weight.as_deref(), None);
            cmd_estimate(name, dosage, patient);
            Ok(())
        }
        Commands::Render {
            input,
            age,
            weight,
            expand,
        } => {
            let patient = PatientInputs::new(age.as_deref(), weight.as_deref(), None);
            cmd_render(&ctx, &input, patient, expand)
        }
        Commands::Export {
            input,
            symptoms,
            age,
            weight,
            out,
        } => {
            let patient = PatientInputs::new(age.as_deref(), weight.as_deref(), None);
            cmd_export(&ctx, &input, symptoms, patient, out)
        }
        Commands::Dosage {
            medicine,
            age,
            weight,
        } => {
            let client = ctx.client()?;
            let outcome = assist::calculate_dosage(
                &client,
                &ctx.config.service,
                &medicine,
                age.as_deref(),
                weight.as_deref(),
            );
            ctx.finish(outcome, |guidance| {
                print!("{}", render::render_dosage_guidance(&guidance, ctx.theme))
            });
            Ok(())
        }
        Commands::Suggest { input, pick } => {
            let client = ctx.client()?;
            let suggestions = assist::symptom_suggestions(&client, &input);
            match pick {
                Some(n) if n >= 1 && n <= suggestions.len() => {
                    println!("{}", symptoms::apply_suggestion(&input, &suggestions[n - 1]));
                }
                Some(n) => {
                    ctx.show(&Notice::warning(format!("No suggestion number {}", n)));
                }
                None => {
                    for (i, suggestion) in suggestions.iter().enumerate() {
                        println!("{}. {}", i + 1, suggestion);
                    }
                }
            }
            Ok(())
        }
        Commands::Remind {
            medicine,
            time,
            frequency,
        } => {
            let client = ctx.client()?;
            let outcome = assist::set_medication_reminder(
                &client,
                &ctx.config.service,
                &medicine,
                time.as_deref(),
                frequency.as_deref(),
            );
            ctx.finish(outcome, |notice| ctx.show(&notice));
            Ok(())
        }
        Commands::Contacts => {
            let client = ctx.client()?;
            let outcome = assist::emergency_contacts(&client);
            ctx.finish(outcome, |contacts| {
                print!("{}", render::render_contacts(&contacts, ctx.theme))
            });
            Ok(())
        }
        Commands::Theme => {
            let (_, notice) = assist::toggle_theme(&ctx.config.preferences_path())?;
            ctx.show(&notice);
            Ok(())
        }
        Commands::History { clear } => cmd_history(&ctx, clear),
        Commands::Config { init } => cmd_config(&ctx, &config_path, init),
    }
}

/// Resolved settings shared by every command
struct Context {
    config: Config,
    theme: Theme,
    dark_mode: bool,
}

impl Context {
    fn credentials(&self) -> Result<CredentialStore> {
        CredentialStore::open(&self.config.credentials_path(), self.config.session_path())
    }

    fn client(&self) -> Result<ServiceClient<HttpTransport>> {
        ServiceClient::http(&self.config.service)
    }

    fn history(&self) -> JsonlHistory {
        JsonlHistory::new(self.config.history_path())
    }

    fn report_dir(&self, out: Option<PathBuf>) -> PathBuf {
        out.or_else(|| self.config.export.output_dir.clone())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    fn show(&self, notice: &Notice) {
        print!("{}", render::render_notice(notice, self.theme));
    }

    fn follow(&self, redirect: &LoginRedirect) {
        self.show(&Notice::warning(redirect.message.clone()));
        println!(
            "Redirecting to {}{} ...",
            self.config.service.base_url.trim_end_matches('/'),
            redirect.target
        );
        std::thread::sleep(redirect.delay);
    }

    fn finish<T>(&self, outcome: Outcome<T>, on_done: impl FnOnce(T)) {
        match outcome {
            Outcome::Done(value) => on_done(value),
            Outcome::Notice(notice) => self.show(&notice),
            Outcome::Redirect(redirect) => self.follow(&redirect),
        }
    }
}

fn cmd_start(ctx: &Context) -> Result<()> {
    let store = ctx.credentials()?;
    match gate::route_on_start(&store)? {
        Route::Welcome => {
            println!("\n╭─────────────────────────────────────────╮");
            println!("│  Welcome to MediFlex");
            println!("╰─────────────────────────────────────────╯");
            println!();
            println!("  Log in with `mediflex login --email <email> --password <password>`");
            println!("  or create an account with `mediflex register`.");
            println!();
        }
        Route::Home { display_name } => {
            println!("Welcome back, {}!", display_name);
            println!("  Run `mediflex analyze \"<symptoms>\"` to get recommendations.");
        }
    }
    Ok(())
}

fn cmd_profile(ctx: &Context) -> Result<()> {
    let store = ctx.credentials()?;
    if !store.is_logged_in()? {
        ctx.show(&Notice::warning("Not logged in"));
        return Ok(());
    }
    for line in gate::profile_lines(&store)? {
        println!("{}", line);
    }
    Ok(())
}

fn cmd_analyze(
    ctx: &Context,
    symptoms: &str,
    patient: PatientInputs,
    expand: bool,
    export: bool,
    out: Option<PathBuf>,
) -> Result<()> {
    let client = ctx.client()?;
    let mut state = AppState::new("", patient);
    state.dark_mode = ctx.dark_mode;
    let theme = Theme::for_state(&state, ctx.theme.color);
    let mut history = ctx.history();

    let outcome = analyze_symptoms(
        &client,
        &mut state,
        symptoms,
        &mut history,
        &ctx.config.service,
    );
    let analysis = match outcome {
        Outcome::Done(analysis) => analysis,
        other => {
            ctx.finish(other, |_| {});
            return Ok(());
        }
    };

    if expand {
        state.expand_all();
    }
    print!(
        "{}",
        render::render_results(
            &state,
            &analysis.prediction,
            analysis.severity.as_ref(),
            theme
        )
    );
    if let Some(panel) = analysis
        .allergies
        .as_ref()
        .and_then(|r| render::render_allergy_conflicts(r, theme))
    {
        println!("{}", panel);
    }
    if let Some(panel) = analysis
        .interactions
        .as_ref()
        .and_then(|r| render::render_interactions(r, theme))
    {
        println!("{}", panel);
    }

    if export {
        let outcome = export_state(
            &state,
            analysis.profile.as_ref(),
            &ctx.report_dir(out),
            Local::now(),
        )?;
        ctx.show(&outcome.notice());
        if let ExportOutcome::Written(path) = &outcome {
            println!("  Report: {}", path.display());
        }
    }

    if let Some(redirect) = &analysis.redirect {
        ctx.follow(redirect);
    }
    Ok(())
}

fn cmd_estimate(name: Option<String>, dosage: Option<String>, patient: PatientInputs) {
    let info = MedicineInfo {
        name,
        dosage,
        ..Default::default()
    };
    let plan = estimate_dosage(&info, &patient);

    println!("Dosage:    {}", plan.dosage);
    println!("Frequency: {}", plan.frequency);
    println!("Duration:  {}", plan.duration);
    println!("Total Tablets Needed: {} tablets", plan.total_tablets);
    if let Some(warning) = plan.age_warning {
        println!("⚠ {}", warning);
    }
}

fn cmd_render(ctx: &Context, input: &Path, patient: PatientInputs, expand: bool) -> Result<()> {
    let body = std::fs::read_to_string(input)?;
    let mut state = AppState::new("", patient);
    state.dark_mode = ctx.dark_mode;

    if let Ok(Reply::Ok(prediction)) = render::parse_prediction_body(&body) {
        state.set_recommendations(prediction.medicines);
        if expand {
            state.expand_all();
        }
    }
    let theme = Theme::for_state(&state, ctx.theme.color);
    let outcome = render::render_response_body(&state, &body, None, theme, &ctx.config.service);
    ctx.finish(outcome, |text| print!("{}", text));
    Ok(())
}

fn cmd_export(
    ctx: &Context,
    input: &Path,
    symptoms: Option<String>,
    patient: PatientInputs,
    out: Option<PathBuf>,
) -> Result<()> {
    let body = std::fs::read_to_string(input)?;
    let prediction = match render::parse_prediction_body(&body) {
        Ok(Reply::Ok(prediction)) => prediction,
        Ok(_) | Err(_) => {
            ctx.show(&Notice::error(render::MALFORMED_RESPONSE));
            return Ok(());
        }
    };

    let symptoms = symptoms
        .or_else(|| prediction.symptoms_analyzed.clone())
        .unwrap_or_default();
    let mut state = AppState::new(symptoms, patient);
    state.set_recommendations(prediction.medicines);

    let outcome = export_state(&state, None, &ctx.report_dir(out), Local::now())?;
    ctx.show(&outcome.notice());
    if let ExportOutcome::Written(path) = &outcome {
        println!("  Report: {}", path.display());
    }
    Ok(())
}

fn cmd_history(ctx: &Context, clear: bool) -> Result<()> {
    let history = ctx.history();
    if clear {
        ctx.show(&assist::clear_history(&history)?);
        return Ok(());
    }

    let records = history.read_all()?;
    if records.is_empty() {
        println!("No consultations recorded yet.");
        return Ok(());
    }
    for record in records {
        println!(
            "{}  {}",
            record
                .recorded_at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M"),
            record.symptoms
        );
        if !record.medicines.is_empty() {
            println!("    → {}", record.medicines.join(", "));
        }
    }
    Ok(())
}

fn cmd_config(ctx: &Context, config_path: &Path, init: bool) -> Result<()> {
    if init {
        ctx.config.save_to(config_path)?;
        ctx.show(&Notice::success(format!(
            "Wrote config to {}",
            config_path.display()
        )));
        return Ok(());
    }

    println!("Config file:  {}", config_path.display());
    println!("Data dir:     {}", ctx.config.data.data_dir.display());
    println!("Service URL:  {}", ctx.config.service.base_url);
    println!("Timeout:      {}s", ctx.config.service.timeout_secs);
    println!("Login path:   {}", ctx.config.service.login_path);
    match &ctx.config.export.output_dir {
        Some(dir) => println!("Report dir:   {}", dir.display()),
        None => println!("Report dir:   (current directory)"),
    }
    println!("Dark mode:    {}", if ctx.dark_mode { "on" } else { "off" });
    Ok(())
}
