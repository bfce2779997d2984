use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use workpool::WorkerPool;

#[derive(Parser, Debug)]
#[command(about = "run a batch of sleeping tasks on a worker pool")]
struct Cli {
    #[arg(short, long, default_value_t = 4)]
    threads: usize,

    #[arg(long, default_value_t = 8)]
    tasks: usize,

    #[arg(short, long, default_value_t = 50)]
    millis: u64,

    #[arg(long, help = "clear the queue after this many milliseconds")]
    clear_after: Option<u64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let finished = Arc::new(AtomicUsize::new(0));

    let pool = WorkerPool::builder()
        .num_threads(cli.threads)
        .thread_name("workpool-cli")
        .build()?;

    for _ in 0..cli.tasks {
        let finished = finished.clone();
        let millis = cli.millis;
        pool.submit(move || {
            thread::sleep(Duration::from_millis(millis));
            finished.fetch_add(1, Ordering::SeqCst);
        });
    }

    println!("threads: {}", pool.thread_count());
    if let Some(delay) = cli.clear_after {
        thread::sleep(Duration::from_millis(delay));
        println!("cleared: {}", pool.clear_queue());
    }

    pool.shutdown();
    println!("finished: {}", finished.load(Ordering::SeqCst));
    Ok(())
}
