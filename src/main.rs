use std::path::PathBuf;

use anyhow::{anyhow, Result};
use rusqlite::{types::ValueRef, Connection};
use rustyline::{error::ReadlineError, Editor};
use structopt::StructOpt;

use parq::{sql, DimTable, Rewriter};

/// Demo dataset: a table partitioned by id and the dimension table that
/// enumerates its (sym, src, side) combinations. The id column of each trade
/// row is the position of its combination in `par`.
const DEMO_SCHEMA: &str = "BEGIN;
    CREATE TABLE par(sym, src, side);
    INSERT INTO par(sym, src, side) VALUES
        ('AAPL', 'FEED', 'B'),
        ('AAPL', 'DB', 'S'),
        ('MSFT', 'FEED', 'B'),
        ('MSFT', 'DB', 'B'),
        ('AMD', 'DB', 'S'),
        ('IBM', 'FEED', 'S')
    ;
    CREATE TABLE trade(sym, src, side, int, size, price);
    INSERT INTO trade(sym, src, side, int, size, price) VALUES
        ('AAPL', 'FEED', 'B', 0, 100, 172),
        ('AAPL', 'DB', 'S', 1, 300, 171),
        ('MSFT', 'FEED', 'B', 2, 80, 410),
        ('MSFT', 'DB', 'B', 3, 700, 411),
        ('AMD', 'DB', 'S', 4, 250, 161),
        ('IBM', 'FEED', 'S', 5, 900, 287)
    ;
    COMMIT;";

#[derive(Debug, StructOpt)]
#[structopt(
    name = "parq",
    about = "Rewrite partition-column filters onto the physical partition id"
)]
struct Opt {
    /// SQLite database holding the dimension table (and, with --run, the data).
    #[structopt(long, conflicts_with = "demo")]
    db: Option<PathBuf>,

    /// Use a small built-in in-memory dataset instead of --db.
    #[structopt(long)]
    demo: bool,

    /// Name of the dimension table.
    #[structopt(long, default_value = "par")]
    dim_table: String,

    /// Name of the physical partition id column.
    #[structopt(long, default_value = "int")]
    id_column: String,

    /// Execute rewritten queries and print the rows instead of the SQL.
    #[structopt(long)]
    run: bool,
}

fn open_db(opt: &Opt) -> Result<Connection> {
    if opt.demo {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(DEMO_SCHEMA)?;
        Ok(conn)
    } else if let Some(path) = &opt.db {
        Ok(Connection::open(path)?)
    } else {
        Err(anyhow!("either --db or --demo is required"))
    }
}

fn handle_input(rewriter: &Rewriter, conn: &Connection, run: bool, code: &str) -> Result<String> {
    let query = rewriter.translate_text(code)?;
    let sql = sql::to_sql(&query)?;
    if !run {
        return Ok(sql);
    }

    let mut stmt = conn.prepare(&sql)?;
    let column_count = stmt.column_count();
    let mut rows = stmt.query([])?;
    let mut out = String::new();
    while let Some(row) = rows.next()? {
        let mut fields = vec![];
        for i in 0..column_count {
            fields.push(match row.get_ref(i)? {
                ValueRef::Null => "null".to_owned(),
                ValueRef::Integer(x) => x.to_string(),
                ValueRef::Real(x) => x.to_string(),
                ValueRef::Text(s) => String::from_utf8_lossy(s).into_owned(),
                ValueRef::Blob(_) => "<blob>".to_owned(),
            });
        }
        out.push_str(&fields.join(" | "));
        out.push('\n');
    }
    Ok(out)
}

fn main() -> Result<()> {
    env_logger::init();
    let opt = Opt::from_args();

    let conn = open_db(&opt)?;
    let dims = DimTable::load(&conn, &opt.dim_table)?;
    let rewriter = Rewriter::with_id_column(&dims, opt.id_column.clone());

    let mut editor = Editor::<()>::new();
    loop {
        let readline = editor.readline("> ");
        match readline {
            Ok(line) => {
                editor.add_history_entry(line.as_str());

                match handle_input(&rewriter, &conn, opt.run, &line) {
                    Ok(output) => {
                        println!("{}", output);
                    }
                    Err(e) => {
                        println!("Error: {}", e);
                    }
                }
            }
            Err(ReadlineError::Interrupted) => break,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {}", err);
                break;
            }
        }
    }

    Ok(())
}
