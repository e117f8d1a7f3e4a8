//! Two threads build one list of points ordered by `x`, taking turns.
//!
//! Each thread then removes two of its own points, the main thread purges
//! the tombstones and prints the points left of `--filter-below`, re-sorted
//! by `y`.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use strand_crossbeam::EpochOrderedList;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "strand-demo", about = "Concurrent ordered list walkthrough")]
struct Args {
    /// Points added by each of the two threads
    #[arg(short, long, default_value_t = 5)]
    points: usize,

    /// Seed for point coordinates
    #[arg(short, long, default_value_t = 7)]
    seed: u64,

    /// Keep points with x below this in the final snapshot
    #[arg(short, long, default_value_t = 80)]
    filter_below: i32,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, default_value_t = Level::INFO)]
    log_level: Level,
}

/// `id` keeps points with equal coordinates distinguishable for `remove`.
#[derive(Clone, Debug, PartialEq)]
struct Point {
    id: usize,
    x: i32,
    y: i32,
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

type PointList = EpochOrderedList<Point>;

fn print_list(list: &PointList) {
    let line: String = list.iter().map(|p| p.to_string()).collect();
    println!("{}", line);
}

/// Strict alternation between the two threads.
struct Turns {
    second: AtomicBool,
}

impl Turns {
    fn wait_for(&self, second: bool) {
        while self.second.load(Ordering::Acquire) != second {
            thread::yield_now();
        }
    }

    fn pass_to(&self, second: bool) {
        self.second.store(second, Ordering::Release);
    }
}

/// One thread's share: add points on its turns, then remove two of them.
fn take_turns(
    list: &PointList,
    turns: &Turns,
    second: bool,
    args: &Args,
    rng: &mut StdRng,
) -> Result<()> {
    let id_base = if second { args.points } else { 0 };
    let mut mine = Vec::with_capacity(args.points);

    for i in 0..args.points {
        turns.wait_for(second);
        let point = Point {
            id: id_base + i,
            x: rng.gen_range(0..100),
            y: rng.gen_range(0..100),
        };
        list.add(point.clone());
        mine.push(point);
        print_list(list);
        turns.pass_to(!second);
    }

    turns.wait_for(second);
    // The first thread drops its 1st and 3rd point, the second its 2nd and 4th.
    let offset = usize::from(second);
    for index in [offset, offset + 2] {
        if let Some(point) = mine.get(index) {
            if !list.remove(point) {
                return Err(anyhow!("point {} was already removed", point));
            }
        }
    }
    print_list(list);
    turns.pass_to(!second);
    Ok(())
}

fn main() -> Result<()> {
    let args = Arc::new(Args::parse());

    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    let list: Arc<PointList> = Arc::new(PointList::with_order(|a: &Point, b: &Point| {
        a.x.cmp(&b.x)
    }));
    let turns = Arc::new(Turns {
        second: AtomicBool::new(false),
    });

    info!(points = args.points, seed = args.seed, "starting walkthrough");

    let extra = {
        let list = Arc::clone(&list);
        let turns = Arc::clone(&turns);
        let args = Arc::clone(&args);
        thread::spawn(move || {
            let mut rng = StdRng::seed_from_u64(args.seed.wrapping_add(1));
            take_turns(&list, &turns, true, &args, &mut rng)
        })
    };

    let mut rng = StdRng::seed_from_u64(args.seed);
    take_turns(&list, &turns, false, &args, &mut rng)?;

    extra
        .join()
        .map_err(|_| anyhow!("extra thread panicked"))??;

    let purged = list.purge();
    print_list(&list);
    info!(purged, "purged removed points");
    println!("Remaining elements: {}", list.len());

    let mut snapshot = list.snapshot_where(|p| p.x < args.filter_below);
    snapshot.sort_by_key(|p| p.y);
    let line: String = snapshot.iter().map(|p| p.to_string()).collect();
    println!("{}", line);

    Ok(())
}
