use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use log::info;
use shipping_labels::{BatchOptions, DirectorySink, LabelConfig, LabelService, LpPrinter, Order};

/// Generates shipping labels from order JSON files.
///
/// Order files hold either a single order object or an array of orders in
/// the order service's camelCase JSON. Set `RUST_LOG=debug` for per-label
/// progress. Printing needs the Liberation Sans fonts; point
/// `SHIPPING_LABEL_FONTS_DIR` at them if they are not installed system-wide.
#[derive(Parser)]
#[command(author, version, about = "Shipping label generator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct OrderSelection {
    /// JSON file containing one order or an array of orders.
    #[arg(long)]
    orders: PathBuf,

    /// Order id to use when the file holds several orders.
    #[arg(long)]
    id: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Save a single 100mm x 150mm label.
    Single {
        #[command(flatten)]
        selection: OrderSelection,

        /// Directory the label is written to.
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },

    /// Save every order as one A4 page of a batch document.
    Batch {
        /// JSON file containing one order or an array of orders.
        #[arg(long)]
        orders: PathBuf,

        /// Directory the batch document is written to.
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },

    /// Send a single label to a printer through `lp`.
    Print {
        #[command(flatten)]
        selection: OrderSelection,

        /// Destination printer; the system default is used when omitted.
        #[arg(long)]
        printer: Option<String>,
    },

    /// Write a PNG preview of a single label.
    Preview {
        #[command(flatten)]
        selection: OrderSelection,

        /// Output PNG path.
        #[arg(long)]
        png: PathBuf,
    },

    /// Render the built-in demo order.
    Demo {
        /// Directory the label is written to.
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(err) = run(cli.command) {
        eprintln!("Error: {}", err);
        print_error_sources(err.as_ref());
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<(), Box<dyn Error>> {
    let mut service = LabelService::new(LabelConfig::new());

    match command {
        Commands::Single { selection, out } => {
            let order = select_order(&selection)?;
            let mut sink = DirectorySink::new(&out);
            let filename = service.download_single_label(&order, &mut sink)?;
            println!("{}", sink.path_for(&filename).display());
        }
        Commands::Batch { orders, out } => {
            let orders = load_orders(&orders)?;
            let mut sink = DirectorySink::new(&out);
            let batch = service.download_batch_labels(&orders, &BatchOptions::new(), &mut sink)?;
            println!("{}", sink.path_for(&batch.filename).display());
            println!("{} succeeded, {} failed", batch.succeeded(), batch.failed());
            for failure in &batch.failures {
                println!("  {}: {}", failure.order_id, failure.reason);
            }
        }
        Commands::Print { selection, printer } => {
            let order = select_order(&selection)?;
            let mut lp = match printer {
                Some(name) => LpPrinter::new().with_printer(name),
                None => LpPrinter::new(),
            };
            service.print_single_label(&order, &mut lp)?;
            println!("Sent label for order {} to the printer", order.id);
        }
        Commands::Preview { selection, png } => {
            let order = select_order(&selection)?;
            let preview = service.preview_label(&order)?;
            fs::write(&png, preview.to_png()?)?;
            println!("{}", png.display());
        }
        Commands::Demo { out } => {
            let mut sink = DirectorySink::new(&out);
            let filename = service.download_single_label(&Order::demo(), &mut sink)?;
            println!("{}", sink.path_for(&filename).display());
        }
    }

    Ok(())
}

fn load_orders(path: &Path) -> Result<Vec<Order>, Box<dyn Error>> {
    let text = fs::read_to_string(path)
        .map_err(|err| format!("cannot read {}: {}", path.display(), err))?;
    let value: serde_json::Value = serde_json::from_str(&text)?;
    let orders: Vec<Order> = if value.is_array() {
        serde_json::from_value(value)?
    } else {
        vec![serde_json::from_value(value)?]
    };
    info!("Loaded {} orders from {}", orders.len(), path.display());
    Ok(orders)
}

fn select_order(selection: &OrderSelection) -> Result<Order, Box<dyn Error>> {
    let orders = load_orders(&selection.orders)?;
    let found = match &selection.id {
        Some(id) => orders.into_iter().find(|order| &order.id == id),
        None => orders.into_iter().next(),
    };
    found.ok_or_else(|| {
        let wanted = selection.id.as_deref().unwrap_or("any order");
        format!("{} not found in {}", wanted, selection.orders.display()).into()
    })
}

fn print_error_sources(mut error: &(dyn Error + 'static)) {
    while let Some(source) = error.source() {
        eprintln!("  caused by: {}", source);
        error = source;
    }
}
