use bincode::{deserialize, serialize};
use shared::{Packet, Vec2};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::sleep;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Create local socket
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    println!("Client socket bound to {}", socket.local_addr()?);

    // Server address
    let server_addr = "127.0.0.1:8080".parse::<SocketAddr>()?;

    // Join the arena
    let join_packet = Packet::Join {
        name: "smoke-test".to_string(),
    };
    let join_data = serialize(&join_packet)?;
    println!("Sending join request to {}", server_addr);
    socket.send_to(&join_data, server_addr).await?;

    // Snapshots dwarf intents, so receive into a big buffer
    let mut buf = [0u8; 65536];

    // Wait for the init packet
    println!("Waiting for server response...");
    let creature_id = loop {
        let (len, addr) = socket.recv_from(&mut buf).await?;
        match deserialize::<Packet>(&buf[0..len]) {
            Ok(Packet::Init {
                creature_id,
                map_width,
                map_height,
                map_border,
            }) => {
                println!(
                    "Joined as creature {} on a {}x{} map with border {}",
                    creature_id, map_width, map_height, map_border
                );
                break creature_id;
            }
            // Snapshots may arrive before the init lands
            Ok(_) => {}
            Err(e) => println!("Failed to deserialize {} bytes from {}: {}", len, addr, e),
        }
    };

    // Steer in a slow circle for ten iterations
    let mut boosting = false;
    for i in 0..10 {
        let angle = i as f32 / 5.0;
        let direction = Vec2::new(angle.sin(), angle.cos());

        let steer_packet = Packet::ChangeDirection { direction };
        socket
            .send_to(&serialize(&steer_packet)?, server_addr)
            .await?;
        println!("Sent direction ({:.2}, {:.2})", direction.x, direction.y);

        // Boost through the middle of the run
        let want_boost = (4..8).contains(&i);
        if want_boost != boosting {
            boosting = want_boost;
            let boost_packet = Packet::Boost { active: boosting };
            socket
                .send_to(&serialize(&boost_packet)?, server_addr)
                .await?;
            println!("Boost {}", if boosting { "on" } else { "off" });
        }

        // Wait for the next snapshot
        loop {
            let (len, _) = socket.recv_from(&mut buf).await?;
            match deserialize::<Packet>(&buf[0..len]) {
                Ok(Packet::GameState {
                    tick,
                    creatures,
                    foods,
                    ..
                }) => {
                    match creatures.get(&creature_id) {
                        Some(own) => {
                            let head = own.segments.first();
                            println!(
                                "Tick {}: {} creatures, {} foods, own length {} at {:?}",
                                tick,
                                creatures.len(),
                                foods.len(),
                                own.segments.len(),
                                head.map(|h| (h.x, h.y)),
                            );
                        }
                        None => println!("Tick {}: own creature missing", tick),
                    }
                    break;
                }
                Ok(Packet::Death { final_score }) => {
                    println!("Died with final score {}", final_score);
                }
                Ok(other) => println!("Received packet: {:?}", other),
                Err(e) => println!("Failed to deserialize snapshot: {}", e),
            }
        }

        sleep(Duration::from_millis(200)).await;
    }

    // Query server health
    socket
        .send_to(&serialize(&Packet::Health)?, server_addr)
        .await?;
    loop {
        let (len, _) = socket.recv_from(&mut buf).await?;
        if let Ok(Packet::HealthReport {
            creatures,
            players,
            bots,
        }) = deserialize::<Packet>(&buf[0..len])
        {
            println!(
                "Health: {} creatures ({} players, {} bots)",
                creatures, players, bots
            );
            break;
        }
    }

    // Send disconnect when done
    println!("Sending disconnect request");
    socket
        .send_to(&serialize(&Packet::Disconnect)?, server_addr)
        .await?;

    println!("Test client finished");

    Ok(())
}
