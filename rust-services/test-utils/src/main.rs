// Copyright 2025 Francisco F. Pinochet
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Simple script to publish a test keypad unlock notification to NATS
//
// Usage: publish_test_event [device_ieee] [code_slot] [source]
use serde_json::json;
use zlm_bus::nats::subject_for;
use zlm_types::{Event, EventType};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let nats_url = std::env::var("ZLM_MESSAGE_BUS__URL")
        .unwrap_or_else(|_| "nats://localhost:4222".to_string());
    let prefix = std::env::var("ZLM_MESSAGE_BUS__SUBJECT_PREFIX")
        .unwrap_or_else(|_| "zlm".to_string());

    let mut args = std::env::args().skip(1);
    let device_ieee = args
        .next()
        .unwrap_or_else(|| "00:0d:6f:ff:fe:a1:b2:c3".to_string());
    let code_slot: u16 = args.next().map(|s| s.parse()).transpose()?.unwrap_or(1);
    let source = args.next().unwrap_or_else(|| "Keypad".to_string());

    println!("🔌 Connecting to NATS: {}", nats_url);
    let client = async_nats::connect(&nats_url).await?;

    let event = Event::new(
        EventType::ZhaEvent,
        "publish-test-event",
        json!({
            "device_ieee": device_ieee,
            "command": "operation_event_notification",
            "args": {
                "source": source,
                "operation": "Unlock",
                "code_slot": code_slot,
            }
        }),
    )?;

    let subject = subject_for(&prefix, EventType::ZhaEvent);

    println!("📤 Publishing unlock notification...");
    println!("   Lock: {}", device_ieee);
    println!("   Slot: {} (operator-facing)", code_slot);
    println!("   Source: {}", source);
    println!("   Subject: {}", subject);

    client
        .publish(subject, serde_json::to_vec(&event)?.into())
        .await?;
    client.flush().await?;

    println!("✅ Event published successfully!");
    println!();
    println!("📝 Next steps:");
    println!("   1. Check lock manager logs for \"Keypad unlock matched a stored code\"");
    println!("   2. Watch the disarm subject: nats sub '{}.alarm_disarm'", prefix);

    Ok(())
}
