use std::env;
use std::process;

use mock_store::{Collection, Fixtures, Store};

fn print_usage() {
    eprintln!(
        "{}\n\nUsage:\n  mock-store list <fixtures.json> [<model>]\n\nNotes:\n  - Prints every record with the id it is assigned at registration.",
        mock_store::about()
    );
}

fn run() -> Result<(), String> {
    let mut args = env::args().skip(1); // skip program name

    let Some(cmd) = args.next() else {
        print_usage();
        return Ok(());
    };

    match cmd.as_str() {
        "list" => {
            let Some(path) = args.next() else {
                return Err("missing <fixtures.json> for list".into());
            };
            let only = args.next();

            let mut fixtures =
                Fixtures::load(&path).map_err(|e| format!("cannot load fixtures: {}", e))?;
            let names: Vec<String> = fixtures.model_names().map(str::to_string).collect();

            let mut store = Store::new();
            for name in &names {
                let collection: Collection = Collection::new(name.clone());
                store
                    .register(&collection, name, fixtures.take(name))
                    .map_err(|e| format!("cannot register {}: {}", name, e))?;
            }

            let selected: Vec<&String> = match &only {
                Some(model) => {
                    if !store.is_registered(model) {
                        return Err(format!("{} is not a model in {}", model, path));
                    }
                    names.iter().filter(|n| *n == model).collect()
                }
                None => names.iter().collect(),
            };

            for name in selected {
                let records = store.enumerate(name).map_err(|e| e.to_string())?;
                println!("{} ({} records)", name, records.len());
                for record in records {
                    println!("  {}", record.export());
                }
            }
            Ok(())
        }
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn main() {
    if let Err(msg) = run() {
        eprintln!("error: {}", msg);
        process::exit(1);
    }
}
