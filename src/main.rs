mod cli;

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use logly::prelude::*;

use cli::{Cli, Commands, KeyKind};
use ridx::index::{IndexHandle, KeyType};
use ridx::storage::buffer::BufferPool;
use ridx::storage::pager::Pager;
use ridx::Rid;

const POOL_CAPACITY: usize = 64;
const FILE_ID: u32 = 0;

fn main() {
    if let Err(e) = run_app() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run_app() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logger = Logger::new();
    let mut logger_config = LoggerConfig::default();
    logger_config.color = true;
    logger.configure(logger_config);

    match &cli.command {
        Commands::Create(args) => {
            let pool = open_pool(&args.path)?;
            let key_type = key_type_of(args.key_type);
            let handle =
                IndexHandle::create(pool, FILE_ID, key_type, args.key_len, args.max_keys)?;
            handle.flush()?;
            logger.success(format!(
                "Created index {} (split threshold {})",
                args.path.display(),
                handle.header().max_key_num
            ))?;
        }
        Commands::Insert(args) => {
            let pool = open_pool(&args.path)?;
            let mut handle = IndexHandle::open(pool, FILE_ID)?;
            let key = encode_key(&handle, &args.key)?;
            handle.insert(&key, Rid::new(args.page, args.slot))?;
            handle.flush()?;
            logger.success(format!(
                "Inserted {} -> rid({}, {})",
                args.key, args.page, args.slot
            ))?;
        }
        Commands::Delete(args) => {
            let pool = open_pool(&args.path)?;
            let mut handle = IndexHandle::open(pool, FILE_ID)?;
            let key = encode_key(&handle, &args.key)?;
            if handle.delete(&key, Rid::new(args.page, args.slot))? {
                handle.flush()?;
                logger.success(format!(
                    "Deleted {} -> rid({}, {})",
                    args.key, args.page, args.slot
                ))?;
            } else {
                logger.error(format!(
                    "No entry {} -> rid({}, {})",
                    args.key, args.page, args.slot
                ))?;
            }
        }
        Commands::Search(args) => {
            let pool = open_pool(&args.path)?;
            let handle = IndexHandle::open(pool, FILE_ID)?;
            let key = encode_key(&handle, &args.key)?;
            if args.first || args.last {
                let pos = if args.first {
                    handle.search_first(&key)?
                } else {
                    handle.search_last(&key)?
                };
                match pos {
                    Some((page, index)) => {
                        logger.info(format!("{} at page {} index {}", args.key, page, index))?
                    }
                    None => logger.info(format!("{} not found", args.key))?,
                }
            } else {
                let rids = handle.search_all(&key)?;
                if rids.is_empty() {
                    logger.info(format!("{} not found", args.key))?;
                } else {
                    for rid in rids {
                        logger.info(format!("{} -> rid({}, {})", args.key, rid.page, rid.slot))?;
                    }
                }
            }
        }
        Commands::Dump(args) => {
            let pool = open_pool(&args.path)?;
            let handle = IndexHandle::open(pool, FILE_ID)?;
            let key_type = handle.header().key_type;
            let (keys, rids) = handle.iter_leaves()?;
            logger.info(format!("{} entries", keys.len()))?;
            for (key, rid) in keys.iter().zip(rids.iter()) {
                logger.info(format!(
                    "{} -> rid({}, {})",
                    key_type.render(key),
                    rid.page,
                    rid.slot
                ))?;
            }
        }
        Commands::Tree(args) => {
            let pool = open_pool(&args.path)?;
            let handle = IndexHandle::open(pool, FILE_ID)?;
            let dump = handle.debug(handle.header().root_node)?;
            print!("{}", dump);
        }
    }

    Ok(())
}

fn open_pool(path: &Path) -> anyhow::Result<Arc<BufferPool>> {
    let pager = Arc::new(Pager::open(path)?);
    let pool = Arc::new(BufferPool::new(POOL_CAPACITY));
    pool.register_pager(FILE_ID, pager);
    Ok(pool)
}

fn key_type_of(kind: KeyKind) -> KeyType {
    match kind {
        KeyKind::Int => KeyType::Int,
        KeyKind::Float => KeyType::Float,
        KeyKind::Str => KeyType::Str,
    }
}

fn encode_key(handle: &IndexHandle, text: &str) -> anyhow::Result<Vec<u8>> {
    let header = handle.header();
    header.key_type.encode(text, header.key_len())
}
