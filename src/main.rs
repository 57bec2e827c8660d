use classvm::jvm::ClassFile;
use classvm::runtime::{Settings, Vm};

use clap::{crate_version, value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::{Path, PathBuf};
use std::process::exit;

fn main() {
    env_logger::init();

    let matches = Command::new("classvm")
        .version(crate_version!())
        .about("Validates JVM class files and interprets their bytecode")
        .arg(
            Arg::new("CLASS")
                .help("Class file to load, or binary name of a class to find on the class path")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("execute")
                .long("execute")
                .action(ArgAction::SetTrue)
                .help("Runs `public static void main(String[])` of the class"),
        )
        .arg(
            Arg::new("check")
                .long("check")
                .action(ArgAction::SetTrue)
                .help("Loads and validates the class file (default)"),
        )
        .arg(
            Arg::new("class path")
                .long("class-path")
                .value_name("DIRECTORY")
                .value_parser(value_parser!(PathBuf))
                .help("Sets the directory searched for classes after the working directory"),
        )
        .arg(
            Arg::new("no simulation")
                .long("no-simulation")
                .action(ArgAction::SetTrue)
                .help("Loads `java/lang` classes from class files instead of simulating them"),
        )
        .arg(
            Arg::new("max depth")
                .long("max-depth")
                .value_name("N")
                .value_parser(value_parser!(usize))
                .help("Sets the maximum number of nested method calls"),
        )
        .arg(
            Arg::new("max steps")
                .long("max-steps")
                .value_name("N")
                .value_parser(value_parser!(u64))
                .help("Stops execution after this many instructions"),
        )
        .get_matches();

    let class = matches
        .get_one::<String>("CLASS")
        .map(String::as_str)
        .unwrap_or_default();

    let mut status = 0;
    if matches.get_flag("check") || !matches.get_flag("execute") {
        status = check(class, &matches);
    }
    if status == 0 && matches.get_flag("execute") {
        status = execute(class, &matches);
    }
    exit(status);
}

/// Path of the class file named on the command line
fn class_file_path(class: &str, class_path: Option<&PathBuf>) -> PathBuf {
    let direct = PathBuf::from(class);
    if direct.is_file() {
        return direct;
    }
    let file_name = format!("{}.class", class);
    match class_path {
        Some(dir) if !Path::new(&file_name).is_file() => dir.join(file_name),
        _ => PathBuf::from(file_name),
    }
}

fn check(class: &str, matches: &ArgMatches) -> i32 {
    let path = class_file_path(class, matches.get_one::<PathBuf>("class path"));
    log::info!("Reading '{}'", path.display());

    match ClassFile::from_path_with_progress(&path) {
        Ok((file, progress)) => {
            if !file.name_matches_path(&path) {
                log::warn!("class {} doesn't match its file name", file.name());
            }
            println!("Class: {}", file.name());
            println!(
                "Version: {}.{}",
                file.version.major_version, file.version.minor_version
            );
            println!("Constant pool slots: {}", file.constants.count().saturating_sub(1));
            println!("Interfaces: {}", file.interfaces.len());
            println!(
                "Fields: {} ({} static slots, {} instance slots)",
                file.fields.len(),
                file.static_field_count,
                file.instance_field_count
            );
            println!("Methods: {}", file.methods.len());
            println!("Attributes: {}", file.attributes.len());
            println!("Bytes read: {}", progress.bytes_read);
            0
        }
        Err(err) => {
            let progress = &err.progress;
            log::debug!("load progress: {:?}", progress);
            println!("Loading finished. Status: {}", err.error.status_code());
            println!("Bytes read: {}", progress.bytes_read);
            println!("Constant pool slots: {}", progress.constant_pool);
            if let Some(index) = progress.invalid_constant {
                println!("Invalid constant pool entry: #{}", index.0);
            }
            println!("Interfaces: {}", progress.interfaces);
            println!("Fields: {}", progress.fields);
            println!("Methods: {}", progress.methods);
            println!("Attributes (current list): {}", progress.attributes);
            println!("Status message: {}.", err);
            err.error.status_code()
        }
    }
}

fn execute(class: &str, matches: &ArgMatches) -> i32 {
    let mut settings = Settings::default();
    settings.class_path = matches.get_one::<PathBuf>("class path").cloned();
    settings.simulate_system_classes = !matches.get_flag("no simulation");
    if let Some(max_depth) = matches.get_one::<usize>("max depth") {
        settings.max_call_depth = *max_depth;
    }
    settings.max_steps = matches.get_one::<u64>("max steps").copied();

    // A path to a class file also puts its directory on the class path
    let direct = Path::new(class);
    if direct.is_file() && settings.class_path.is_none() {
        settings.class_path = direct.parent().map(Path::to_path_buf);
    }

    let mut vm = Vm::new(settings);
    let result = if direct.is_file() {
        vm.load_class_file(direct).and_then(|id| {
            let name = vm.class(id).file.name().to_owned();
            vm.run_main(&name)
        })
    } else {
        vm.run_main(class)
    };
    log::info!("Executed {} instructions", vm.steps());

    let (status, message) = match result {
        Ok(()) => (0, String::from("Ok")),
        Err(err) => (err.status_code(), err.to_string()),
    };
    println!("Execution finished. Status: {}", status);
    println!("Status message: {}.", message);
    status
}
