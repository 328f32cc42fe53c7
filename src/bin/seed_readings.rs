use chrono::{Duration, NaiveDateTime, Timelike};
use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use std::env;
use std::f64::consts::PI;

use maizewatch_backend::config::{Config, DEFAULT_FIELD_ID};
use maizewatch_backend::services::reading_store::{
    Measurements, ReadingStore, SeaOrmReadingStore, SensorReading,
};
use maizewatch_backend::services::telemetry_sync::farm_now;
use maizewatch_backend::services::thingspeak::ThingSpeakClient;

const SEED_DAYS: i64 = 7;
const SEED_STEP_HOURS: i64 = 3;

/// Plausible maize-field conditions for a farm-local hour
fn synthetic_measurements(at: NaiveDateTime, day: i64) -> Measurements {
    let hour = f64::from(at.hour());
    // Peaks at 14:00, bottoms out at 02:00
    let diurnal = ((hour - 8.0) / 24.0 * 2.0 * PI).sin();
    let daylight = (6..18).contains(&at.hour());

    Measurements {
        temperature: 26.0 + 5.0 * diurnal,
        humidity: 70.0 - 15.0 * diurnal,
        // Soil slowly dries out over the week
        soil_moisture: 45.0 - day as f64 * 1.5,
        soil_ph: 6.4 + 0.05 * diurnal,
        light_intensity: if daylight {
            (900.0 * ((hour - 6.0) / 12.0 * PI).sin()).max(0.0)
        } else {
            0.0
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    let push = args.iter().any(|a| a == "--push");
    if args.iter().skip(1).any(|a| a != "--push") {
        eprintln!("Usage: {} [--push]", args[0]);
        std::process::exit(1);
    }

    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    let db = Database::connect(&config.database_url).await?;
    migration::Migrator::up(&db, None).await?;
    let store = SeaOrmReadingStore::new(db);

    if store.latest().await?.is_some() {
        println!("sensor_readings already has data, skipping seed");
    } else {
        let now = farm_now()
            .with_minute(0)
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or_else(farm_now);
        let start = now - Duration::days(SEED_DAYS);
        let steps = SEED_DAYS * 24 / SEED_STEP_HOURS;

        let mut inserted = 0;
        for step in 0..steps {
            let timestamp = start + Duration::hours(step * SEED_STEP_HOURS);
            let day = step * SEED_STEP_HOURS / 24;
            let reading = SensorReading {
                timestamp,
                field_id: DEFAULT_FIELD_ID.to_string(),
                measurements: synthetic_measurements(timestamp, day),
            };

            if store.insert_if_absent(reading).await? {
                inserted += 1;
            }
        }

        println!("Seeded {} readings from {} to {}", inserted, start, now);
    }

    if push {
        let client = ThingSpeakClient::new(&config.thingspeak)?;
        let measurements = synthetic_measurements(farm_now(), 0);
        let entry_id = client.push_entry(&measurements).await?;
        println!("Pushed entry {} to channel {}", entry_id, config.thingspeak.channel_id);
    }

    Ok(())
}
