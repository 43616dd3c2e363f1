use clap::{Parser as ClapParser, Subcommand};
use std::{cell::Cell, collections::BTreeSet, process, sync::Arc};

use rand::{Rng, SeedableRng, rngs::StdRng};
use rexxcore::{
    Array, Message, MutableBuffer, Queue, Receiver, Result, RexxError, Selector, TailTable, Value,
};

#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log at debug level
    #[arg(long, global = true, help = "Enable debug logging")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Insert random tails into a compound-tail tree and verify its balance
    TreeCheck {
        #[arg(long, default_value_t = 10_000)]
        inserts: usize,
        #[arg(long, default_value_t = 10)]
        rounds: usize,
        #[arg(long, default_value_t = 1)]
        seed: u64,
    },
    /// Stable-sort a random dense array and count comparisons
    Sort {
        #[arg(long, default_value_t = 100_000)]
        count: usize,
        #[arg(long, default_value_t = 1)]
        seed: u64,
        #[arg(long, help = "Sort input that is already in order")]
        presorted: bool,
    },
    /// Run the reference scenarios and print their outcome
    Demo,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let outcome = match cli.command {
        Command::TreeCheck {
            inserts,
            rounds,
            seed,
        } => tree_check(inserts, rounds, seed),
        Command::Sort {
            count,
            seed,
            presorted,
        } => sort(count, seed, presorted),
        Command::Demo => demo(),
    };

    if let Err(err) = outcome {
        eprintln!("Error: {} ({})", err, err.name());
        process::exit(1);
    }
}

fn tree_check(inserts: usize, rounds: usize, seed: u64) -> Result<()> {
    let mut rng = StdRng::seed_from_u64(seed);
    for round in 1..=rounds {
        let mut table = TailTable::new();
        let mut expected = BTreeSet::new();
        for _ in 0..inserts {
            let key = format!("K{}", rng.gen_range(0..inserts.max(1) * 4));
            table.set(key.as_bytes(), Value::from(key.as_str()));
            expected.insert(key.into_bytes());
        }
        if let Err(violation) = table.check_balance() {
            eprintln!("round {round}: {violation}");
            process::exit(2);
        }
        let in_order: Vec<Vec<u8>> = table
            .iter()
            .map(|(name, _)| name.as_bytes().to_vec())
            .collect();
        if !in_order.iter().eq(expected.iter()) {
            eprintln!("round {round}: traversal is out of order");
            process::exit(2);
        }
        let nodes = table.node_count();
        let bound = 1.4405 * ((nodes + 2) as f64).log2();
        println!(
            "round {round}: {nodes} nodes, depth {} (bound {bound:.1})",
            table.depth()
        );
    }
    Ok(())
}

fn sort(count: usize, seed: u64, presorted: bool) -> Result<()> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut values: Vec<i64> = (0..count).map(|_| rng.gen_range(0..1_000_000)).collect();
    if presorted {
        values.sort_unstable();
    }
    let mut array = Array::of(values.iter().copied().map(Value::from))?;

    let comparisons = Cell::new(0usize);
    array.stable_sort_with(|a, b| {
        comparisons.set(comparisons.get() + 1);
        a.compare(b)
    })?;

    let sorted: Vec<i64> = array
        .slots()
        .iter()
        .filter_map(|slot| slot.as_ref().and_then(Value::as_integer))
        .collect();
    values.sort();
    if sorted != values {
        eprintln!("sort produced the wrong order");
        process::exit(2);
    }
    let n = count.max(2) as f64;
    println!(
        "{count} items, {} comparisons ({:.2} x n log2 n)",
        comparisons.get(),
        comparisons.get() as f64 / (n * n.log2())
    );
    Ok(())
}

fn send(target: &Value, name: &str, arguments: &[Value]) -> Result<Option<Value>> {
    target.send(&Selector::new(name), arguments)
}

fn show(value: Option<Value>) -> String {
    value.map_or_else(|| "(empty)".to_owned(), |value| value.to_string())
}

struct Greeter;

impl Receiver for Greeter {
    fn invoke(&self, selector: &Selector, _: &[Value]) -> Result<Option<Value>> {
        match selector.name() {
            "FOO" => Ok(Some(Value::from("bar"))),
            "NOTHING" => Ok(None),
            _ => Err(RexxError::NoMethod {
                selector: selector.name().to_owned(),
            }),
        }
    }

    fn type_name(&self) -> &str {
        "a Greeter"
    }
}

fn demo() -> Result<()> {
    println!("1. sparse array");
    let array = Value::object(Array::new(3)?);
    send(&array, "put", &["a".into(), 1i64.into()])?;
    send(&array, "put", &["b".into(), 3i64.into()])?;
    println!("   items = {}", show(send(&array, "items", &[])?));
    println!("   at(2) = {}", show(send(&array, "at", &[2i64.into()])?));
    let section = send(&array, "section", &[1i64.into(), 3i64.into()])?;
    if let Some(section) = &section {
        println!(
            "   section(1,3): size {}, items {}",
            show(send(section, "size", &[])?),
            show(send(section, "items", &[])?)
        );
    }

    println!("2. multi-dimensional extension");
    let grid = Value::object(Array::new(0)?);
    send(&grid, "[]=", &[5i64.into(), 1i64.into(), 2i64.into()])?;
    println!(
        "   dimension(1) = {}, dimension(2) = {}",
        show(send(&grid, "dimension", &[1i64.into()])?),
        show(send(&grid, "dimension", &[2i64.into()])?)
    );

    println!("3. queue");
    let queue = Value::object(Queue::new());
    send(&queue, "push", &[1i64.into()])?;
    send(&queue, "push", &[2i64.into()])?;
    for _ in 0..3 {
        println!("   pull = {}", show(send(&queue, "pull", &[])?));
    }

    println!("4. buffer insert");
    let buffer = Value::object(MutableBuffer::new(b"abc"));
    send(&buffer, "insert", &["X".into(), 2i64.into()])?;
    println!("   {}", show(send(&buffer, "makeString", &[])?));

    println!("5. buffer changeStr");
    let buffer = Value::object(MutableBuffer::new(b"hello world"));
    send(&buffer, "changeStr", &["o".into(), "00".into()])?;
    println!("   {}", show(send(&buffer, "makeString", &[])?));

    println!("6. asynchronous message");
    let target = Value::Native(Arc::new(Greeter));
    for name in ["foo", "nothing"] {
        let message = Message::new(target.clone(), Selector::new(name), vec![]);
        message.start()?;
        message.wait()?;
        println!("   {name}: hasResult = {}", message.has_result());
    }
    Ok(())
}
