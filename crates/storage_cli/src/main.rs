/* 📖 # Why is the CLI minimal and hand-parsed?

The CLI is a thin caller of storage_utils with no argument parsing library:

1. **Reduces complexity**: every command is `storage <command> <paths...>`
2. **Same code path as library users**: each command is one call on `Storage`
3. **Local by default**: no Swift/S3 SDK client is linked in, so object store paths
   report a configuration error unless an embedding program registers a client

Credentials are still read (from `storage.toml` in the current directory, or from
the environment) so the error can say whether they were found.

Exit codes:
- 0: Success
- 1: The operation failed
- 2: Usage error
*/

use std::env;
use std::process;

use storage_base::tracing::init_tracing;
use storage_base::{StorageError, StorageResult};
use storage_utils::{Path, PathOperations, Scheme, Storage, StorageConfig, load_config};
use tracing::{debug, warn};

const USAGE: &str = "Usage: storage <command> [arguments]

Commands:
  ls <path>                 list the children of a directory
  glob <path> <pattern>     list paths matching <path>/<pattern>
  walk <path> [pattern]     list every file below <path>
  exists <path>             print whether the path exists
  stat <path>               print kind and size
  rm <path>                 remove one file or object
  rmtree <path>             remove a whole tree
  cp <source> <dest>        copy one file
  cptree <source> <dest>    copy a directory tree
  expand <path>             expand variables and ~, then normalize";

const CONFIG_FILE: &str = "storage.toml";

fn main() {
    if let Err(e) = init_tracing() {
        eprintln!("Warning: {}", e);
    }

    let args: Vec<String> = env::args().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        eprintln!("{}", USAGE);
        process::exit(2);
    };

    let storage = Storage::new();
    let config = read_config(&storage);

    match run(&storage, command, rest) {
        Ok(()) => process::exit(0),
        Err(e) if e.get_context().is_empty() && is_usage_error(&e) => {
            eprintln!("Error: {}\n\n{}", e, USAGE);
            process::exit(2);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            if e.is_configuration() {
                print_client_hint(&config);
            }
            process::exit(1);
        }
    }
}

fn read_config(storage: &Storage) -> StorageConfig {
    let loaded = match Path::new(CONFIG_FILE) {
        Ok(path) if storage.local().isfile(&path).unwrap_or(false) => load_config(storage, &path),
        _ => StorageConfig::from_env(),
    };
    loaded.unwrap_or_else(|e| {
        warn!(error = %e, "ignoring storage credentials");
        StorageConfig::default()
    })
}

fn print_client_hint(config: &StorageConfig) {
    for scheme in Scheme::ALL {
        if config.has_credentials(scheme) {
            eprintln!(
                "Note: {} credentials were found, but this binary has no {} client; \
                 register one with Storage::with_client",
                scheme, scheme
            );
        }
    }
}

fn is_usage_error(error: &StorageError) -> bool {
    matches!(error.kind(), storage_base::ErrorKind::Message { message } if message.starts_with("usage:"))
}

fn arg<'a>(args: &'a [String], index: usize, name: &str) -> StorageResult<&'a str> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| storage_base::err!("usage: missing argument <{}>", name))
}

fn path_arg(args: &[String], index: usize, name: &str) -> StorageResult<Path> {
    Path::new(arg(args, index, name)?)
}

fn print_paths(mut paths: Vec<Path>) {
    paths.sort();
    for path in paths {
        println!("{}", path);
    }
}

fn run(storage: &Storage, command: &str, args: &[String]) -> StorageResult<()> {
    debug!(command, ?args, "running command");
    match command {
        "ls" => print_paths(storage.listdir(&path_arg(args, 0, "path")?)?),
        "glob" => {
            let path = path_arg(args, 0, "path")?;
            print_paths(storage.glob(&path, arg(args, 1, "pattern")?)?);
        }
        "walk" => {
            let path = path_arg(args, 0, "path")?;
            let pattern = args.get(1).map(String::as_str);
            print_paths(storage.walkfiles(&path, pattern)?);
        }
        "exists" => println!("{}", storage.exists(&path_arg(args, 0, "path")?)?),
        "stat" => {
            let path = path_arg(args, 0, "path")?;
            let kind = if storage.isdir(&path)? { "directory" } else { "file" };
            println!("{}\t{}\t{}", kind, storage.getsize(&path)?, path);
        }
        "rm" => storage.remove(&path_arg(args, 0, "path")?)?,
        "rmtree" => storage.rmtree(&path_arg(args, 0, "path")?)?,
        "cp" => storage.copy(&path_arg(args, 0, "source")?, &path_arg(args, 1, "dest")?)?,
        "cptree" => {
            storage.copytree(&path_arg(args, 0, "source")?, &path_arg(args, 1, "dest")?)?
        }
        "expand" => println!("{}", path_arg(args, 0, "path")?.expand()),
        other => storage_base::bail!("usage: unknown command '{}'", other),
    }
    Ok(())
}
