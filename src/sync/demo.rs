//! Synthetic data for demo mode. Reads only; never persisted.

use chrono::{Duration, Utc};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::store::models::{Driver, Order, Run};

const SUBURBS: &[(&str, &str)] = &[
    ("Surry Hills", "2010"),
    ("Newtown", "2042"),
    ("Marrickville", "2204"),
    ("Bondi Junction", "2022"),
    ("Alexandria", "2015"),
    ("Pyrmont", "2009"),
    ("Leichhardt", "2040"),
    ("Randwick", "2031"),
];

const FIRST_NAMES: &[&str] = &["Jane", "Tom", "Olivia", "Noah", "Mia", "Lucas", "Grace", "Ethan"];
const LAST_NAMES: &[&str] = &["Doe", "Nguyen", "Smith", "Patel", "Kowalski", "Brown", "Santos"];
const STREET_NAMES: &[&str] = &["King", "George", "Crown", "Oxford", "Victoria", "Albion"];
const DRIVER_NAMES: &[&str] = &[
    "Marcus Chen",
    "Sarah Thompson",
    "Ahmed Hassan",
    "Lisa Nguyen",
    "James Wilson",
    "Maria Garcia",
    "David Kim",
    "Emma Roberts",
    "Ryan O'Brien",
    "Priya Patel",
];
const ZONES: &[&str] = &["Inner West", "Eastern Suburbs", "CBD", "South Sydney", "Inner City"];
const STATUSES: &[&str] = &["pending", "allocated", "in_transit", "delivered", "failed"];

pub fn orders(n: usize) -> Vec<Order> {
    let mut rng = rand::thread_rng();
    let base = Utc::now() - Duration::hours(8);
    let today = Utc::now().format("%Y-%m-%d").to_string();

    (0..n)
        .map(|_| {
            let (suburb, postcode) = SUBURBS.choose(&mut rng).copied().unwrap_or(SUBURBS[0]);
            let status = STATUSES.choose(&mut rng).copied().unwrap_or("pending");
            let created = base + Duration::minutes(rng.gen_range(0..480));
            let assigned = matches!(status, "allocated" | "in_transit" | "delivered");

            Order {
                order_id: format!("SMC-{}", rng.gen_range(10000..=99999)),
                tracking_number: Some(format!(
                    "WRX-{}-{:06X}",
                    Utc::now().format("%y%m"),
                    rng.gen_range(0..0xFFFFFFu32)
                )),
                customer: format!(
                    "{} {}",
                    FIRST_NAMES.choose(&mut rng).copied().unwrap_or("Jane"),
                    LAST_NAMES.choose(&mut rng).copied().unwrap_or("Doe"),
                ),
                email: None,
                phone: None,
                address: format!(
                    "{} {} St",
                    rng.gen_range(1..=200),
                    STREET_NAMES.choose(&mut rng).copied().unwrap_or("King"),
                ),
                suburb: suburb.to_string(),
                state: "NSW".to_string(),
                postcode: postcode.to_string(),
                zone: ZONES.choose(&mut rng).map(|z| z.to_string()),
                service_level: "standard".to_string(),
                parcels: rng.gen_range(1..=5),
                status: status.to_string(),
                driver_id: assigned.then(|| format!("DRV-{}", rng.gen_range(100..=110))),
                special_instructions: None,
                proof_photo: None,
                proof_signature: None,
                delivery_notes: None,
                delivered_at: (status == "delivered").then(Utc::now),
                pushed_to_wms: false,
                wms_response: None,
                order_date: today.clone(),
                created_at: created,
                updated_at: created,
            }
        })
        .collect()
}

pub fn drivers(n: usize) -> Vec<Driver> {
    let mut rng = rand::thread_rng();

    (0..n)
        .map(|i| {
            let on_route = rng.gen_bool(0.6);
            Driver {
                driver_id: format!("DRV-{}", 100 + i),
                name: DRIVER_NAMES
                    .get(i % DRIVER_NAMES.len())
                    .copied()
                    .unwrap_or("Marcus Chen")
                    .to_string(),
                vehicle_type: if rng.gen_bool(0.3) { "Truck" } else { "Van" }.to_string(),
                plate: format!(
                    "{}{}{}-{}",
                    rng.gen_range(b'A'..=b'Z') as char,
                    rng.gen_range(b'A'..=b'Z') as char,
                    rng.gen_range(b'A'..=b'Z') as char,
                    rng.gen_range(100..=999)
                ),
                status: if on_route { "on_route" } else { "available" }.to_string(),
                current_zone: ZONES.choose(&mut rng).copied().unwrap_or("CBD").to_string(),
                phone: format!("04{:02} {:03} {:03}", rng.gen_range(10..100), rng.gen_range(100..1000), rng.gen_range(100..1000)),
                deliveries_today: rng.gen_range(8..=25),
                success_rate: rng.gen_range(0.94..0.99),
                rating: rng.gen_range(4.5..5.0),
                active_orders: if on_route { rng.gen_range(0..=8) } else { 0 },
                latitude: None,
                longitude: None,
                location_updated_at: None,
                created_at: Utc::now(),
            }
        })
        .collect()
}

pub fn runs(n: usize) -> Vec<Run> {
    let mut rng = rand::thread_rng();
    let today = Utc::now().format("%y%m%d").to_string();

    (0..n)
        .map(|i| {
            let total = rng.gen_range(8..=20);
            Run {
                run_id: format!("RUN-{today}-{:03}", i + 1),
                zone: ZONES.choose(&mut rng).copied().unwrap_or("CBD").to_string(),
                driver_id: format!("DRV-{}", rng.gen_range(100..=109)),
                driver_name: DRIVER_NAMES
                    .choose(&mut rng)
                    .copied()
                    .unwrap_or("Marcus Chen")
                    .to_string(),
                status: "active".to_string(),
                total_stops: total,
                completed: rng.gen_range(0..=total),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            }
        })
        .collect()
}
