use clap::{Arg, ArgAction, ArgMatches, Command};
use cookify_lib::app_dirs;
use cookify_lib::events::{drain_notices, BroadcastEmitter, NoticeLevel};
use cookify_lib::filter::ProjectFilter;
use cookify_lib::profile::{CookieProfile, Profile, ProfileKind, SwaggerProfile};
use cookify_lib::storage::{FileStore, StorageAdapter};
use cookify_lib::transfer::{self, EXPORT_FILE_NAME};
use cookify_lib::{Cookify, CookifyError, Result};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

const EVENT_CAPACITY: usize = 64;

fn kind_arg() -> Arg {
  Arg::new("kind")
    .required(true)
    .value_parser(clap::value_parser!(ProfileKind))
    .help("Profile kind (cookie, swagger)")
}

fn filter_args(command: Command) -> Command {
  command
    .arg(Arg::new("search").short('s').long("search").help("Search term"))
    .arg(
      Arg::new("project")
        .short('p')
        .long("project")
        .help("Project to filter by (\"Not specified\" for none); remembered for later runs"),
    )
    .arg(
      Arg::new("clear")
        .long("clear")
        .action(ArgAction::SetTrue)
        .conflicts_with("project")
        .help("Forget the remembered project filter"),
    )
}

fn cookie_args(command: Command, required: bool) -> Command {
  command
    .arg(Arg::new("name").long("name").required(required).help("Cookie name"))
    .arg(Arg::new("value").long("value").required(required).help("Cookie value"))
    .arg(Arg::new("url").long("url").help("Target URL override"))
    .arg(Arg::new("domain").long("domain").help("Target domain override"))
    .arg(Arg::new("project").long("project").help("Project tag"))
}

fn swagger_args(command: Command, required: bool) -> Command {
  command
    .arg(Arg::new("token").long("token").required(required).help("Bearer token"))
    .arg(
      Arg::new("auto-login")
        .long("auto-login")
        .value_parser(clap::value_parser!(bool))
        .help("Log in automatically on matching pages"),
    )
    .arg(
      Arg::new("url")
        .long("url")
        .action(ArgAction::Append)
        .help("Docs page the profile is meant for (repeatable)"),
    )
    .arg(Arg::new("project").long("project").help("Project tag"))
}

fn cli() -> Command {
  Command::new("cookify")
    .about("Save, organize and re-apply cookie and bearer-token profiles")
    .subcommand_required(true)
    .arg(
      Arg::new("data-dir")
        .long("data-dir")
        .env(app_dirs::DATA_DIR_ENV)
        .global(true)
        .value_parser(clap::value_parser!(PathBuf))
        .help("Directory holding the stored profiles"),
    )
    .subcommand(filter_args(
      Command::new("list")
        .about("List profiles in display order")
        .arg(
          Arg::new("kind")
            .default_value("cookie")
            .value_parser(clap::value_parser!(ProfileKind))
            .help("Profile kind (cookie, swagger)"),
        ),
    ))
    .subcommand(cookie_args(
      Command::new("add-cookie")
        .about("Add a cookie profile")
        .arg(Arg::new("alias").required(true).help("Unique alias")),
      true,
    ))
    .subcommand(swagger_args(
      Command::new("add-swagger")
        .about("Add a swagger profile")
        .arg(Arg::new("alias").required(true).help("Unique alias")),
      true,
    ))
    .subcommand(cookie_args(
      Command::new("edit-cookie")
        .about("Edit a cookie profile")
        .arg(Arg::new("alias").required(true).help("Alias of the profile to edit"))
        .arg(Arg::new("rename").long("rename").help("New alias")),
      false,
    ))
    .subcommand(swagger_args(
      Command::new("edit-swagger")
        .about("Edit a swagger profile")
        .arg(Arg::new("alias").required(true).help("Alias of the profile to edit"))
        .arg(Arg::new("rename").long("rename").help("New alias")),
      false,
    ))
    .subcommand(
      Command::new("delete")
        .about("Delete a profile")
        .arg(kind_arg())
        .arg(Arg::new("alias").required(true)),
    )
    .subcommand(filter_args(
      Command::new("move")
        .about("Move a row within the (filtered) list")
        .arg(kind_arg())
        .arg(
          Arg::new("from")
            .required(true)
            .value_parser(clap::value_parser!(usize)),
        )
        .arg(
          Arg::new("to")
            .required(true)
            .value_parser(clap::value_parser!(usize)),
        ),
    ))
    .subcommand(Command::new("projects").about("List all known projects"))
    .subcommand(
      Command::new("add-project")
        .about("Register a project")
        .arg(Arg::new("name").required(true)),
    )
    .subcommand(
      Command::new("delete-project")
        .about("Delete a project and detach it from every profile")
        .arg(Arg::new("name").required(true)),
    )
    .subcommand(
      Command::new("settings").about("Show or change settings").arg(
        Arg::new("apply-on-click")
          .long("apply-on-click")
          .value_parser(clap::value_parser!(bool))
          .help("Apply a profile as soon as its row is selected"),
      ),
    )
    .subcommand(
      Command::new("export")
        .about("Write all profiles and settings to a JSON file")
        .arg(
          Arg::new("output")
            .short('o')
            .long("output")
            .value_parser(clap::value_parser!(PathBuf))
            .help("Output file (\"-\" for stdout)"),
        ),
    )
    .subcommand(
      Command::new("import")
        .about("Replace profiles and settings from an exported JSON file")
        .arg(
          Arg::new("file")
            .value_parser(clap::value_parser!(PathBuf))
            .help("Export to read (defaults to the latest export in the exports directory)"),
        ),
    )
}

/// `None` for absent values and for ids the subcommand does not define.
fn string(matches: &ArgMatches, id: &str) -> Option<String> {
  matches.try_get_one::<String>(id).ok().flatten().cloned()
}

fn required(matches: &ArgMatches, id: &str) -> String {
  string(matches, id).unwrap_or_default()
}

fn apply_filters(app: &mut Cookify, kind: ProfileKind, matches: &ArgMatches) {
  if let Some(search) = string(matches, "search") {
    app.set_search(kind, search);
  }
  if let Some(project) = string(matches, "project") {
    app.set_project_filter(kind, Some(ProjectFilter::parse(&project)));
  }
  let clear = matches.try_get_one::<bool>("clear").ok().flatten().copied();
  if clear.unwrap_or(false) {
    app.set_project_filter(kind, None);
  }
}

fn print_list(app: &Cookify, kind: ProfileKind) {
  let query = app.query(kind);
  if let Some(summary) = query.summary() {
    eprintln!("Filtered by {summary}");
    if query.project.is_some() {
      eprintln!("(run with --clear to show every project)");
    }
  }

  match kind {
    ProfileKind::Cookie => {
      for (index, cookie) in app.visible_cookies().iter().enumerate() {
        println!(
          "{index}\t{}\t{}={}\t{}",
          cookie.alias,
          cookie.name,
          cookie.value,
          cookie.project.as_deref().unwrap_or("-")
        );
      }
    }
    ProfileKind::Swagger => {
      for (index, swagger) in app.visible_swaggers().iter().enumerate() {
        println!(
          "{index}\t{}\tautoLogin={}\t{}",
          swagger.alias,
          swagger.auto_login,
          swagger.project.as_deref().unwrap_or("-")
        );
      }
    }
  }
}

fn edited_cookie(mut cookie: CookieProfile, matches: &ArgMatches) -> CookieProfile {
  if let Some(alias) = string(matches, "rename") {
    cookie.alias = alias;
  }
  if let Some(name) = string(matches, "name") {
    cookie.name = name;
  }
  if let Some(value) = string(matches, "value") {
    cookie.value = value;
  }
  if let Some(url) = string(matches, "url") {
    cookie.url = Some(url).filter(|u| !u.is_empty());
  }
  if let Some(domain) = string(matches, "domain") {
    cookie.domain = Some(domain).filter(|d| !d.is_empty());
  }
  if let Some(project) = string(matches, "project") {
    cookie.project = Some(project).filter(|p| !p.is_empty());
  }
  cookie
}

fn edited_swagger(mut swagger: SwaggerProfile, matches: &ArgMatches) -> SwaggerProfile {
  if let Some(alias) = string(matches, "rename") {
    swagger.alias = alias;
  }
  if let Some(token) = string(matches, "token") {
    swagger.bearer_token = token;
  }
  if let Some(auto_login) = matches.get_one::<bool>("auto-login") {
    swagger.auto_login = *auto_login;
  }
  if let Some(urls) = matches.get_many::<String>("url") {
    swagger.urls = urls.cloned().collect();
  }
  if let Some(project) = string(matches, "project") {
    swagger.project = Some(project).filter(|p| !p.is_empty());
  }
  swagger
}

fn edit(app: &mut Cookify, kind: ProfileKind, matches: &ArgMatches) -> Result<()> {
  let alias = required(matches, "alias");
  app.begin_edit(kind, &alias)?;
  let profile = match app.navigator().editing().cloned() {
    Some(Profile::Cookie(cookie)) => Profile::Cookie(edited_cookie(cookie, matches)),
    Some(Profile::Swagger(swagger)) => Profile::Swagger(edited_swagger(swagger, matches)),
    None => return Err(CookifyError::not_found(kind, alias)),
  };
  app.submit(profile)?;
  println!("Updated {kind} profile '{alias}'");
  Ok(())
}

fn run(app: &mut Cookify, matches: &ArgMatches) -> Result<()> {
  match matches.subcommand() {
    Some(("list", sub)) => {
      let kind = sub
        .get_one::<ProfileKind>("kind")
        .copied()
        .unwrap_or(ProfileKind::Cookie);
      apply_filters(app, kind, sub);
      print_list(app, kind);
    }
    Some(("add-cookie", sub)) => {
      app.begin_create(ProfileKind::Cookie);
      let cookie = edited_cookie(
        CookieProfile::new(required(sub, "alias"), required(sub, "name"), required(sub, "value")),
        sub,
      );
      app.submit(cookie.into())?;
      println!("Added cookie profile '{}'", required(sub, "alias"));
    }
    Some(("add-swagger", sub)) => {
      app.begin_create(ProfileKind::Swagger);
      let swagger = edited_swagger(
        SwaggerProfile::new(required(sub, "alias"), required(sub, "token")),
        sub,
      );
      app.submit(swagger.into())?;
      println!("Added swagger profile '{}'", required(sub, "alias"));
    }
    Some(("edit-cookie", sub)) => edit(app, ProfileKind::Cookie, sub)?,
    Some(("edit-swagger", sub)) => edit(app, ProfileKind::Swagger, sub)?,
    Some(("delete", sub)) => {
      let kind = *sub
        .get_one::<ProfileKind>("kind")
        .unwrap_or(&ProfileKind::Cookie);
      let alias = required(sub, "alias");
      if app.delete_profile(kind, &alias) {
        println!("Deleted {kind} profile '{alias}'");
      } else {
        println!("No {kind} profile named '{alias}'");
      }
    }
    Some(("move", sub)) => {
      let kind = *sub
        .get_one::<ProfileKind>("kind")
        .unwrap_or(&ProfileKind::Cookie);
      apply_filters(app, kind, sub);
      let from = sub.get_one::<usize>("from").copied().unwrap_or_default();
      let to = sub.get_one::<usize>("to").copied().unwrap_or_default();
      if !app.reorder(kind, from, to) {
        println!("Nothing moved: row index out of range");
      }
      print_list(app, kind);
    }
    Some(("projects", _)) => {
      for project in app.all_projects() {
        println!("{project}");
      }
    }
    Some(("add-project", sub)) => {
      let name = required(sub, "name");
      if app.add_project(&name) {
        println!("Added project '{name}'");
      } else {
        println!("Project '{name}' is blank or already exists");
      }
    }
    Some(("delete-project", sub)) => {
      let name = required(sub, "name");
      let detached = app.delete_project(&name);
      println!("Deleted project '{name}' ({detached} profile(s) detached)");
    }
    Some(("settings", sub)) => {
      if let Some(enabled) = sub.get_one::<bool>("apply-on-click") {
        app.set_apply_on_click(*enabled);
      }
      let settings = app.settings();
      println!("applyOnClick: {}", settings.apply_on_click);
      println!("projects: {}", settings.projects.join(", "));
    }
    Some(("export", sub)) => {
      let json = app.export()?;
      match sub.get_one::<PathBuf>("output") {
        Some(path) if path.as_os_str() == "-" => println!("{json}"),
        output => {
          let path = match output {
            Some(path) => path.clone(),
            None => app_dirs::exports_dir()?.join(EXPORT_FILE_NAME),
          };
          if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
          }
          std::fs::write(&path, json)?;
          println!("Exported to {}", path.display());
        }
      }
    }
    Some(("import", sub)) => {
      let path = match sub.get_one::<PathBuf>("file") {
        Some(path) => path.clone(),
        None => {
          let dir = app_dirs::exports_dir()?;
          transfer::find_export(&dir).unwrap_or_else(|| dir.join(EXPORT_FILE_NAME))
        }
      };
      if !transfer::is_json_file(&path) {
        log::warn!("{} does not look like an export file", path.display());
      }
      let json = std::fs::read_to_string(&path)?;
      app.import(&json)?;
    }
    _ => {}
  }
  Ok(())
}

fn main() {
  env_logger::Builder::from_default_env()
    .filter_level(log::LevelFilter::Warn)
    .format_timestamp_millis()
    .init();

  let matches = cli().get_matches();

  let data_dir = match matches.get_one::<PathBuf>("data-dir") {
    Some(dir) => dir.clone(),
    None => match app_dirs::data_dir() {
      Ok(dir) => dir,
      Err(e) => {
        eprintln!("{e}");
        process::exit(1);
      }
    },
  };
  log::debug!("Using data directory {}", data_dir.display());

  let (emitter, mut events) = BroadcastEmitter::with_capacity(EVENT_CAPACITY);
  let mut app = Cookify::load(
    StorageAdapter::new(FileStore::new(data_dir)),
    Arc::new(emitter),
  );

  let result = run(&mut app, &matches);

  let mut failed = false;
  for notice in drain_notices(&mut events) {
    match notice.level {
      NoticeLevel::Error => {
        failed = true;
        eprintln!("{}", notice.message);
      }
      _ => println!("{}", notice.message),
    }
  }

  if let Err(e) = result {
    if !failed {
      eprintln!("{e}");
    }
    process::exit(1);
  }
  if failed {
    process::exit(1);
  }
}
