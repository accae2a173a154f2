//! lessonflow CLI - course catalog, enrollment and lesson progress.

use std::path::PathBuf;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use lessonflow_core::{
    Course, CourseId, Enrollment, Lesson, LessonAccessMode, LessonId, LessonKind, Module,
    ModuleId, UserId, ViewerRole,
};
use lessonflow_progress::{CourseOverview, ProgressService, ServiceConfig};
use lessonflow_storage::{JsonStorage, Storage};

#[derive(Parser)]
#[command(name = "lessonflow")]
#[command(about = "Lesson access and progress tracking", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Storage directory for JSON data
    #[arg(short, long, default_value = ".lessonflow", global = true)]
    storage: PathBuf,

    /// SQLite database file; replaces the JSON storage directory
    #[cfg(feature = "sqlite")]
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage courses
    Course {
        #[command(subcommand)]
        action: CourseCommand,
    },
    /// Add a module to a course
    Module {
        #[command(subcommand)]
        action: ModuleCommand,
    },
    /// Add a lesson to a module
    Lesson {
        #[command(subcommand)]
        action: LessonCommand,
    },
    /// Enroll a user in a course (a new user id is generated if omitted)
    Enroll {
        /// Course ID
        course: CourseId,
        /// User ID
        #[arg(long)]
        user: Option<UserId>,
    },
    /// Show a course with lesson gating and progress for a user
    Outline {
        /// Course ID
        course: CourseId,
        /// User ID
        #[arg(long)]
        user: UserId,
        /// Viewer role (student, instructor, admin)
        #[arg(long, default_value = "student")]
        role: ViewerRole,
    },
    /// Mark a lesson complete
    Complete {
        /// Course ID
        course: CourseId,
        /// Lesson ID
        lesson: LessonId,
        /// User ID
        #[arg(long)]
        user: UserId,
        /// Viewer role (student, instructor, admin)
        #[arg(long, default_value = "student")]
        role: ViewerRole,
        /// Refuse to complete a lesson that is still locked
        #[arg(long)]
        strict: bool,
    },
    /// Mark a lesson incomplete
    Uncomplete {
        /// Course ID
        course: CourseId,
        /// Lesson ID
        lesson: LessonId,
        /// User ID
        #[arg(long)]
        user: UserId,
        /// Viewer role (student, instructor, admin)
        #[arg(long, default_value = "student")]
        role: ViewerRole,
    },
    /// Show where a user should continue
    Next {
        /// Course ID
        course: CourseId,
        /// User ID
        #[arg(long)]
        user: UserId,
        /// Viewer role (student, instructor, admin)
        #[arg(long, default_value = "student")]
        role: ViewerRole,
    },
}

#[derive(Subcommand)]
enum CourseCommand {
    /// Create a course
    Add {
        /// Course title
        title: String,
        /// Lesson access mode (sequential, all_access)
        #[arg(long, default_value = "sequential")]
        mode: LessonAccessMode,
    },
    /// List courses
    List,
}

#[derive(Subcommand)]
enum ModuleCommand {
    /// Create a module
    Add {
        /// Course ID
        course: CourseId,
        /// Module title
        title: String,
        /// Position in the course (defaults to the end)
        #[arg(long)]
        order: Option<i32>,
    },
}

#[derive(Subcommand)]
enum LessonCommand {
    /// Create a lesson
    Add {
        /// Module ID
        module: ModuleId,
        /// Lesson title
        title: String,
        /// Course-wide position (defaults to the end of the course)
        #[arg(long)]
        order: Option<i32>,
        /// Lesson type (content, quiz)
        #[arg(long = "type", default_value = "content")]
        kind: LessonKind,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "lessonflow={level},lessonflow_progress={level},lessonflow_storage={level}"
        ))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    #[cfg(feature = "sqlite")]
    if let Some(path) = &cli.database {
        let storage = lessonflow_storage::SqliteStorage::new_from_path(path).await?;
        info!(database = %path.display(), "Using SQLite storage");
        return run(storage, cli.command, cli.json).await;
    }

    let storage = JsonStorage::new(&cli.storage)
        .await
        .with_context(|| format!("opening storage at {}", cli.storage.display()))?;
    run(storage, cli.command, cli.json).await
}

async fn run<S: Storage + 'static>(storage: S, command: Commands, json: bool) -> Result<()> {
    let service = ProgressService::new(storage);

    match command {
        Commands::Course { action: CourseCommand::Add { title, mode } } => {
            let course = Course::new(title, mode);
            service.storage().lock().await.save_course(&course).await?;
            info!(course = %course.id, "Course created");
            println!("Added course: {} - {} ({})", course.id, course.title, course.lesson_access_mode);
        }
        Commands::Course { action: CourseCommand::List } => {
            let courses = service.storage().lock().await.list_courses().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&courses)?);
                return Ok(());
            }
            println!("Courses ({})", courses.len());
            for course in courses {
                println!("  {} | {} | {}", course.id, course.lesson_access_mode, course.title);
            }
        }
        Commands::Module { action: ModuleCommand::Add { course, title, order } } => {
            let storage = service.storage();
            let mut storage = storage.lock().await;
            if storage.load_course(course).await?.is_none() {
                anyhow::bail!("Course not found: {}", course);
            }
            let order = match order {
                Some(order) => order,
                None => storage
                    .list_modules(course)
                    .await?
                    .last()
                    .map_or(0, |m| m.order_index + 1),
            };
            let module = Module::new(course, title, order);
            storage.save_module(&module).await?;
            println!("Added module: {} - {} (#{})", module.id, module.title, module.order_index);
        }
        Commands::Lesson { action: LessonCommand::Add { module, title, order, kind } } => {
            let storage = service.storage();
            let mut storage = storage.lock().await;
            let course_id = find_module_course(&*storage, module).await?;
            let order = match order {
                Some(order) => order,
                None => storage
                    .fetch_lessons(course_id)
                    .await?
                    .iter()
                    .map(|l| l.order_index + 1)
                    .max()
                    .unwrap_or(0),
            };
            let lesson = Lesson::new(course_id, module, title, order).with_kind(kind);
            storage.save_lesson(&lesson).await?;
            println!("Added lesson: {} - {} (#{}, {})", lesson.id, lesson.title, lesson.order_index, lesson.kind);
        }
        Commands::Enroll { course, user } => {
            let user = user.unwrap_or_default();
            let storage = service.storage();
            let mut storage = storage.lock().await;
            if storage.load_course(course).await?.is_none() {
                anyhow::bail!("Course not found: {}", course);
            }
            storage.save_enrollment(&Enrollment::new(user, course)).await?;
            println!("Enrolled user {} in course {}", user, course);
        }
        Commands::Outline { course, user, role } => {
            let overview = service.overview(user, course, role).await?;
            print_overview(&overview, json)?;
        }
        Commands::Complete { course, lesson, user, role, strict } => {
            let service = service.with_config(ServiceConfig {
                require_accessible_to_complete: strict,
                ..Default::default()
            });
            let overview = service.complete_lesson(user, lesson, course, role).await?;
            print_overview(&overview, json)?;
        }
        Commands::Uncomplete { course, lesson, user, role } => {
            let overview = service.uncomplete_lesson(user, lesson, course, role).await?;
            print_overview(&overview, json)?;
        }
        Commands::Next { course, user, role } => {
            let resume = service.resume(user, course, role).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&resume)?);
                return Ok(());
            }
            match resume {
                Some(point) => println!(
                    "Next lesson: {}{}",
                    point.lesson_id,
                    if point.accessible { "" } else { " (locked)" }
                ),
                None => println!("Course has no lessons"),
            }
        }
    }

    Ok(())
}

/// Modules are only indexed per course, so scan the catalog for the owner.
async fn find_module_course<S: Storage>(storage: &S, module: ModuleId) -> Result<CourseId> {
    for course in storage.list_courses().await? {
        let modules = storage.list_modules(course.id).await?;
        if modules.iter().any(|m| m.id == module) {
            return Ok(course.id);
        }
    }
    Err(anyhow::anyhow!("Module not found: {}", module))
}

fn print_overview(overview: &CourseOverview, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(overview)?);
        return Ok(());
    }

    println!("{} [{}]", overview.title, overview.access_mode);
    println!(
        "  Progress: {}/{} ({}%)",
        overview.progress.completed, overview.progress.total, overview.progress.percentage
    );
    for module in &overview.modules {
        println!(
            "  {} ({}/{})",
            module.title, module.progress.completed_lessons_count, module.progress.lessons_count
        );
        for lesson in &module.lessons {
            let mark = match (lesson.completed, lesson.accessible) {
                (true, _) => "[x]",
                (false, true) => "[ ]",
                (false, false) => "[#]",
            };
            println!("    {} {} {} ({})", mark, lesson.lesson_id, lesson.title, lesson.kind);
        }
    }
    if let Some(next) = overview.next_lesson {
        println!("  Next: {}", next);
    }
    Ok(())
}
