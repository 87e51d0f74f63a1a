use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;

use transcription_client::{
    channel_status_badge, collect_media_files, engine_type_name, estimate_transcription_cost,
    filter_tasks_by_filename, filter_users, format_date, format_duration, format_file_size,
    page_summary, print_task_line, progress_visible, render_task_markdown, role_badge,
    task_status_badge, task_status_description, user_status_badge, AdminCommand, ApiClient, Args,
    Command, Config, EngineCommand, ListArgs, Paginated, ProgressBarObserver,
    RegisterRequest, Session, TaskAnalytics, TaskCommand, TaskListParams, TopUpCommand,
    TranscriptionTask, UploadArgs, UserCommand, UserListParams, UserUpdate,
};

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(e) = run(args).await {
        println!("\n{} Error: {:#}", "✗".red(), e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(url) = args.service_url {
        config.service_url = url;
    }
    log::debug!("Using service at {}", config.service_url);

    let session = Arc::new(Session::load()?);
    let client = ApiClient::new(config, session)?;
    let verbose = args.verbose;

    match args.command {
        Command::Login { username, password } => {
            if client.login(&username, &password).await? {
                println!("{} Logged in as {}", "✓".green(), username.bold());
            } else {
                println!(
                    "{} Login accepted but no access token was issued",
                    "⋯".yellow()
                );
            }
        }
        Command::Register {
            username,
            password,
            email,
            code,
        } => {
            let registration = RegisterRequest {
                username,
                password,
                email,
                verification_code: code,
            };
            let message = client.register(&registration).await?;
            println!("{} {}", "✓".green(), non_empty(&message, "Registered"));
            println!("{} Log in with: {}", "↳".blue(), "transcribe login".bold());
        }
        Command::VerifyEmail { email } => {
            client.send_verification_code(&email).await?;
            println!("{} Verification code sent to {}", "✓".green(), email);
        }
        Command::Logout => {
            client.logout().await?;
            println!("{} Logged out", "✓".green());
        }
        Command::Profile {
            display_name,
            email,
            password,
        } => {
            if display_name.is_some() || email.is_some() || password.is_some() {
                let update = UserUpdate {
                    display_name,
                    email,
                    password,
                    ..Default::default()
                };
                client.update_self(&update).await?;
                println!("{} Profile updated", "✓".green());
            }
            show_profile(&client).await;
        }
        Command::Token { save } => {
            let token = client.generate_access_token().await?;
            println!("{} New access token: {}", "✓".green(), token.bold());
            if save {
                client.remember_token(&token)?;
                println!("{} Stored for this client", "↳".blue());
            }
        }
        Command::Upload(upload) => run_upload(&client, upload, verbose).await?,
        Command::Estimate { file, duration } => {
            let metadata = std::fs::metadata(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let cost = estimate_transcription_cost(metadata.len(), duration);
            println!(
                "{} {} ({}): estimated cost {} quota",
                "→".blue(),
                file.display(),
                format_file_size(metadata.len()),
                cost.to_string().bold()
            );
        }
        Command::Tasks(command) => run_tasks(&client, command, verbose).await?,
        Command::Languages => {
            for language in client.supported_languages().await? {
                println!("{:<8} {}", language.code.bold(), language.name);
            }
        }
        Command::Formats => {
            for format in client.supported_formats().await? {
                println!(
                    "{:<6} {:<24} {:?}",
                    format.extension.bold(),
                    format.mime_type,
                    format.category
                );
            }
        }
        Command::Topup(command) => run_topup(&client, command).await?,
        Command::Admin(command) => {
            require_admin(&client).await?;
            run_admin(&client, command).await?;
        }
    }

    Ok(())
}

fn non_empty<'a>(message: &'a str, fallback: &'a str) -> &'a str {
    if message.is_empty() {
        fallback
    } else {
        message
    }
}

async fn show_profile(client: &ApiClient) {
    let profile = client.profile().await;

    match profile.user {
        Ok(user) => {
            println!("\n{} {}", "👤".blue(), user.username.bold());
            if let Some(name) = user.display_name.as_deref().filter(|n| !n.is_empty()) {
                println!("  Name:     {}", name);
            }
            if let Some(email) = user.email.as_deref().filter(|e| !e.is_empty()) {
                println!("  Email:    {}", email);
            }
            println!("  Role:     {}", role_badge(user.role_kind()));
            println!("  Status:   {}", user_status_badge(user.status_kind()));
            println!("  Quota:    {} (used {})", user.quota, user.used_quota);
            println!("  Requests: {}", user.request_count);
        }
        Err(e) => println!("{} Could not load user: {:#}", "✗".red(), e),
    }

    match profile.stats {
        Ok(stats) => {
            println!("\n{}", "Usage".bold());
            println!(
                "  Tasks:    {} total, {} completed, {} failed, {} in progress",
                stats.total_tasks, stats.completed_tasks, stats.failed_tasks, stats.processing_tasks
            );
            println!(
                "  Audio:    {}",
                format_duration(stats.total_duration.max(0) as u64)
            );
            println!(
                "  Uploaded: {}",
                format_file_size(stats.total_file_size.max(0) as u64)
            );
            println!("  Spent:    {} quota", stats.total_quota_cost);
        }
        Err(e) => println!("{} Could not load usage stats: {:#}", "✗".red(), e),
    }
}

async fn run_upload(client: &ApiClient, upload: UploadArgs, verbose: bool) -> Result<()> {
    if !upload.path.exists() {
        anyhow::bail!("Path does not exist: {}", upload.path.display());
    }
    if upload.recursive && !upload.path.is_dir() {
        anyhow::bail!("--recursive only applies to directories");
    }

    let files = collect_media_files(&upload.path, upload.recursive)?;
    if files.is_empty() {
        anyhow::bail!("No supported audio or video files found");
    }
    if let Some(dir) = &upload.output {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    println!("{} Found {} file(s) to transcribe", "→".blue(), files.len());

    let mut failed = 0;
    for file in files {
        if let Err(e) = upload_one(client, &upload, file.clone(), verbose).await {
            println!("{} {}: {:#}", "✗".red(), file.display(), e);
            failed += 1;
        }
    }

    if failed > 0 {
        anyhow::bail!("{} upload(s) failed", failed);
    }
    Ok(())
}

async fn upload_one(client: &ApiClient, upload: &UploadArgs, file: PathBuf, verbose: bool) -> Result<()> {
    let size = std::fs::metadata(&file)
        .with_context(|| format!("Failed to read {}", file.display()))?
        .len();
    let duration = upload.duration.map(|secs| secs.max(0) as u64);
    println!(
        "{} Uploading {} ({}, estimated cost {})",
        "→".blue(),
        file.display(),
        format_file_size(size),
        estimate_transcription_cost(size, duration)
    );

    let task = client.create_task(&upload.request_for(file)).await?;
    println!("{} Created task #{}", "✓".green(), task.id);

    if !upload.wait {
        return Ok(());
    }

    let mut observer = ProgressBarObserver::new(&format!("#{}", task.id));
    let task = client.wait_for_task(task.id, &mut observer).await?;
    println!("{} Transcription complete!", "✓".green());

    if let Some(dir) = &upload.output {
        let path = client.save_result(&task, None, dir).await?;
        println!("{} Saved result to: {}", "✓".green(), path.display());

        let summary = dir.join(format!("{}.md", task.original_filename));
        std::fs::write(&summary, render_task_markdown(&task))
            .with_context(|| format!("Failed to write {}", summary.display()))?;
    }

    if verbose {
        if let Some(text) = &task.result_text {
            println!("\n{}", "Transcription:".bold());
            println!("{}\n", text);
        }
    }

    Ok(())
}

fn task_params(list: &ListArgs, username: Option<String>) -> TaskListParams {
    TaskListParams {
        page: Some(list.page),
        page_size: Some(list.page_size),
        status: list.status,
        username,
    }
}

fn print_task_page(page: &Paginated<TranscriptionTask>, list: &ListArgs) {
    let tasks: Vec<&TranscriptionTask> = match &list.search {
        Some(search) => filter_tasks_by_filename(page.items(), search),
        None => page.items().iter().collect(),
    };

    if tasks.is_empty() {
        println!("{} No tasks found", "→".blue());
    }
    for task in tasks {
        print_task_line(task);
    }

    println!("\n{}", page_summary(list.page, list.page_size, page.total));
}

fn print_task_detail(task: &TranscriptionTask, verbose: bool) {
    println!("\n{} #{} {}", "📄".blue(), task.id, task.original_filename.bold());
    println!("  Status:   {}", task_status_badge(task.status));
    println!(
        "            {}",
        task_status_description(task.status, task.failure_reason().as_deref())
    );
    if progress_visible(task.status) {
        println!("  Progress: {}%", task.progress);
    }
    println!("  Size:     {}", format_file_size(task.file_size.max(0) as u64));
    if let Some(duration) = task.duration {
        println!("  Duration: {}", format_duration(duration.max(0) as u64));
    }
    println!("  Language: {}", task.language);
    println!("  Format:   {}", task.output_format.as_str());
    println!("  Quality:  {}", task.quality.as_str());
    println!("  Cost:     {} quota", task.quota_cost);
    println!("  Created:  {}", format_date(&task.created_at));
    if let Some(completed_at) = &task.completed_at {
        println!("  Finished: {}", format_date(completed_at));
    }
    if verbose {
        if let Some(text) = &task.result_text {
            println!("\n{}", text);
        }
    }
}

async fn run_tasks(client: &ApiClient, command: TaskCommand, verbose: bool) -> Result<()> {
    match command {
        TaskCommand::List(list) => {
            let page = client.list_tasks(&task_params(&list, None)).await?;
            print_task_page(&page, &list);
        }
        TaskCommand::Show { id } => {
            let task = client.get_task(id).await?;
            print_task_detail(&task, verbose);
        }
        TaskCommand::Watch { id } => {
            let mut observer = ProgressBarObserver::new(&format!("#{}", id));
            let task = client.wait_for_task(id, &mut observer).await?;
            println!("{} Task #{} completed", "✓".green(), task.id);
        }
        TaskCommand::Cancel { id } => {
            client.cancel_task(id).await?;
            println!("{} Task #{} cancelled", "✓".green(), id);
        }
        TaskCommand::Delete { id } => {
            client.delete_task(id).await?;
            println!("{} Task #{} deleted", "✓".green(), id);
        }
        TaskCommand::Download { id, format, output } => {
            let task = client.get_task(id).await?;
            let dir = output.unwrap_or_else(|| PathBuf::from("."));
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            let path = client.save_result(&task, format.as_deref(), &dir).await?;
            println!("{} Saved result to: {}", "✓".green(), path.display());
        }
        TaskCommand::Preview { id, format } => {
            println!("{}", client.preview_result(id, format).await?);
        }
        TaskCommand::Stats => {
            let stats = client.user_stats().await?;
            println!(
                "{} {} tasks: {} completed, {} failed, {} in progress",
                "→".blue(),
                stats.total_tasks,
                stats.completed_tasks,
                stats.failed_tasks,
                stats.processing_tasks
            );
            println!(
                "{} {} of audio, {} quota spent",
                "→".blue(),
                format_duration(stats.total_duration.max(0) as u64),
                stats.total_quota_cost
            );
        }
    }
    Ok(())
}

async fn run_topup(client: &ApiClient, command: TopUpCommand) -> Result<()> {
    match command {
        TopUpCommand::Redeem { code } => {
            let result = client.redeem_code(&code).await?;
            let gift = if result.is_gift { " (gift)" } else { "" };
            println!("{} Added {} quota{}", "✓".green(), result.quota, gift);
        }
        TopUpCommand::Pay { amount, method } => {
            let order = client.request_payment(amount, &method).await?;
            println!("{} Payment order created", "✓".green());
            println!("{} Complete the payment at: {}", "↳".blue(), order.url.bold());
        }
        TopUpCommand::Price { amount } => {
            let price = client.payment_amount(amount).await?;
            println!("{} {} quota costs {}", "→".blue(), amount, price.bold());
        }
    }
    Ok(())
}

async fn require_admin(client: &ApiClient) -> Result<()> {
    let user = client.current_user().await?;
    if !user.is_admin() {
        anyhow::bail!("Administrator access required (logged in as {})", user.username);
    }
    Ok(())
}

async fn run_admin(client: &ApiClient, command: AdminCommand) -> Result<()> {
    match command {
        AdminCommand::Dashboard => {
            let overview = client.overview(10).await;

            match overview.stats {
                Ok(stats) => {
                    println!("\n{}", "System".bold());
                    println!("  Users:    {}", stats.total_users);
                    println!("  Tasks:    {} ({} today)", stats.total_tasks, stats.today_tasks);
                    println!(
                        "  Audio:    {} ({} today)",
                        format_duration(stats.total_duration.max(0) as u64),
                        format_duration(stats.today_duration.max(0) as u64)
                    );
                    println!(
                        "  Storage:  {}",
                        format_file_size(stats.total_file_size.max(0) as u64)
                    );
                }
                Err(e) => println!("{} Could not load system stats: {:#}", "✗".red(), e),
            }

            match overview.recent_tasks {
                Ok(page) => {
                    println!("\n{}", "Recent tasks".bold());
                    for task in page.items() {
                        print_task_line(task);
                    }
                }
                Err(e) => println!("{} Could not load recent tasks: {:#}", "✗".red(), e),
            }
        }
        AdminCommand::Stats => {
            let params = TaskListParams {
                page: Some(1),
                page_size: Some(100),
                ..Default::default()
            };
            let page = client.list_all_tasks(&params).await?;
            let analytics = TaskAnalytics::compute(page.items(), Local::now());

            println!("\n{} (last {} tasks)", "Usage".bold(), page.items().len());
            println!(
                "  Created:  {} today, {} this week, {} this month",
                analytics.today, analytics.week, analytics.month
            );
            println!("  Success:  {}%", analytics.success_rate);
            println!(
                "  Avg size: {}",
                format_file_size(analytics.avg_file_size.round() as u64)
            );
            println!(
                "  Audio:    {}",
                format_duration(analytics.total_duration.max(0) as u64)
            );
            for status in transcription_client::TaskStatus::ALL {
                println!("  {:<24} {}", task_status_badge(status), analytics.count(status));
            }
            if !analytics.popular_formats.is_empty() {
                println!("\n{}", "Popular formats".bold());
                for (ext, count) in &analytics.popular_formats {
                    println!("  {:<6} {}", ext, count);
                }
            }
        }
        AdminCommand::Tasks { list, username } => {
            let page = client.list_all_tasks(&task_params(&list, username)).await?;
            print_task_page(&page, &list);
        }
        AdminCommand::DeleteTask { id } => {
            client.delete_task(id).await?;
            println!("{} Task #{} deleted", "✓".green(), id);
        }
        AdminCommand::Engines(command) => run_engines(client, command).await?,
        AdminCommand::Users(command) => run_users(client, command).await?,
    }
    Ok(())
}

async fn run_engines(client: &ApiClient, command: EngineCommand) -> Result<()> {
    match command {
        EngineCommand::List => {
            let (engines, types) = tokio::join!(client.list_engines(), client.engine_types());
            let engines = engines?;
            // the built-in names are enough when the type list is unavailable
            let types = types.unwrap_or_else(|e| {
                log::warn!("Engine types unavailable: {:#}", e);
                Vec::new()
            });

            if engines.is_empty() {
                println!("{} No engines configured", "→".blue());
            }
            for engine in engines {
                println!(
                    "#{:<4} {:<24} {:<16} {} weight {}",
                    engine.id,
                    engine.name.bold(),
                    engine_type_name(&types, engine.engine_type),
                    channel_status_badge(engine.status_kind()),
                    engine.weight.unwrap_or(0)
                );
            }
        }
        EngineCommand::Types => {
            for engine_type in client.engine_types().await? {
                println!("{:<4} {}", engine_type.id, engine_type.name);
            }
        }
        EngineCommand::Create(fields) => {
            let engine = client.create_engine(&fields.into()).await?;
            println!("{} Created engine #{} {}", "✓".green(), engine.id, engine.name);
        }
        EngineCommand::Update { id, fields } => {
            let engine = client.update_engine(id, &fields.into()).await?;
            println!("{} Updated engine #{} {}", "✓".green(), engine.id, engine.name);
        }
        EngineCommand::Delete { id } => {
            client.delete_engine(id).await?;
            println!("{} Engine #{} deleted", "✓".green(), id);
        }
        EngineCommand::Test { id } => {
            let result = client.test_engine(id).await?;
            let tested_at = result
                .tested_at()
                .map(|at| format!(" (tested {})", format_date(&at)))
                .unwrap_or_default();
            match result.error {
                Some(error) => {
                    println!("{} Engine #{} failed: {}{}", "✗".red(), id, error, tested_at);
                    if result.auto_disabled == Some(true) {
                        println!("{} The engine was disabled automatically", "↳".blue());
                    }
                }
                None => println!(
                    "{} Engine #{} {}{}",
                    "✓".green(),
                    id,
                    result.status,
                    tested_at
                ),
            }
        }
        EngineCommand::Enable { ids } => {
            let updated = client.set_engines_status(ids, 1).await?;
            println!("{} Enabled {} engine(s)", "✓".green(), updated);
        }
        EngineCommand::Disable { ids } => {
            let updated = client.set_engines_status(ids, 2).await?;
            println!("{} Disabled {} engine(s)", "✓".green(), updated);
        }
    }
    Ok(())
}

async fn run_users(client: &ApiClient, command: UserCommand) -> Result<()> {
    match command {
        UserCommand::List {
            page,
            page_size,
            keyword,
            search,
        } => {
            let params = UserListParams {
                page: Some(page),
                page_size: Some(page_size),
                keyword,
            };
            let result = client.list_users(&params).await?;
            let users = match &search {
                Some(search) => filter_users(result.items(), search),
                None => result.items().iter().collect(),
            };

            for user in users {
                println!(
                    "#{:<5} {:<20} {:<12} {:<8} quota {} (used {})",
                    user.id,
                    user.username.bold(),
                    role_badge(user.role_kind()),
                    user_status_badge(user.status_kind()),
                    user.quota,
                    user.used_quota
                );
            }
            println!("\n{}", page_summary(page, page_size, result.total));
        }
        UserCommand::Show { id } => {
            let user = client.get_user(id).await?;
            println!("\n#{} {}", user.id, user.username.bold());
            println!("  Email:    {}", user.email.as_deref().unwrap_or("-"));
            println!("  Role:     {}", role_badge(user.role_kind()));
            println!("  Status:   {}", user_status_badge(user.status_kind()));
            println!("  Group:    {}", user.group);
            println!("  Quota:    {} (used {})", user.quota, user.used_quota);
        }
        UserCommand::Update {
            id,
            display_name,
            email,
            role,
            status,
            quota,
            group,
        } => {
            let update = UserUpdate {
                display_name,
                email,
                role,
                status,
                quota,
                group,
                ..Default::default()
            };
            let user = client.update_user(id, &update).await?;
            println!("{} Updated user #{} {}", "✓".green(), user.id, user.username);
        }
        UserCommand::Delete { id } => {
            client.delete_user(id).await?;
            println!("{} User #{} deleted", "✓".green(), id);
        }
    }
    Ok(())
}
