use arrow::array::{Array, Float64Array};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use arrow::util::display::array_value_to_string;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::env;
use std::fs::File;

const PREVIEW_ROWS: usize = 20;

fn print_row(batch: &RecordBatch, row: usize) -> Result<(), Box<dyn std::error::Error>> {
    let cells = batch
        .columns()
        .iter()
        .map(|c| array_value_to_string(c.as_ref(), row).map(|v| format!("{:>16}", v)))
        .collect::<Result<Vec<_>, _>>()?;
    println!("{}", cells.join(" "));
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <parquet_file>", args[0]);
        std::process::exit(1);
    }

    let filepath = &args[1];
    println!("\n{}", "=".repeat(100));
    println!("Inspecting: {}", filepath);
    println!("{}", "=".repeat(100));

    let file = File::open(filepath)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let schema = builder.schema().clone();
    let reader = builder.build()?;

    let mut all_batches = Vec::new();
    let mut total_rows = 0;
    for batch_result in reader {
        let batch = batch_result?;
        total_rows += batch.num_rows();
        all_batches.push(batch);
    }

    println!("Schema:");
    for field in schema.fields() {
        println!(
            "    {:<20} {:?}{}",
            field.name(),
            field.data_type(),
            if field.is_nullable() { " (nullable)" } else { "" }
        );
    }
    println!("Total rows: {}", total_rows);

    if all_batches.is_empty() || total_rows == 0 {
        println!("No data found!");
        return Ok(());
    }

    let header = schema
        .fields()
        .iter()
        .map(|f| format!("{:>16}", f.name()))
        .collect::<Vec<_>>()
        .join(" ");

    // Head of the first batch
    println!("\n{} FIRST {} ROWS {}", "=".repeat(40), PREVIEW_ROWS, "=".repeat(40));
    println!("{}", header);
    println!("{}", "-".repeat(100));
    let first_batch = &all_batches[0];
    for i in 0..first_batch.num_rows().min(PREVIEW_ROWS) {
        print_row(first_batch, i)?;
    }

    // Tail of the last batch
    if total_rows > PREVIEW_ROWS {
        println!("\n{} LAST {} ROWS {}", "=".repeat(40), PREVIEW_ROWS, "=".repeat(40));
        println!("{}", header);
        println!("{}", "-".repeat(100));
        let last_batch = &all_batches[all_batches.len() - 1];
        let start_idx = last_batch.num_rows().saturating_sub(PREVIEW_ROWS);
        for i in start_idx..last_batch.num_rows() {
            print_row(last_batch, i)?;
        }
    }

    // Null and NaN counts per column
    println!("\n{} SANITY CHECKS {}", "=".repeat(40), "=".repeat(40));
    for (idx, field) in schema.fields().iter().enumerate() {
        let mut nulls = 0usize;
        let mut nans = 0usize;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;

        for batch in &all_batches {
            let column = batch.column(idx);
            nulls += column.null_count();
            if field.data_type() == &DataType::Float64 {
                if let Some(values) = column.as_any().downcast_ref::<Float64Array>() {
                    for v in values.iter().flatten() {
                        if v.is_nan() {
                            nans += 1;
                        } else {
                            min = min.min(v);
                            max = max.max(v);
                        }
                    }
                }
            }
        }

        if field.data_type() == &DataType::Float64 && min <= max {
            println!(
                "✓ {:<20} nulls: {:>8}  NaN: {:>8}  range: {:.4} .. {:.4}",
                field.name(),
                nulls,
                nans,
                min,
                max
            );
        } else {
            println!("✓ {:<20} nulls: {:>8}  NaN: {:>8}", field.name(), nulls, nans);
        }
    }

    Ok(())
}
