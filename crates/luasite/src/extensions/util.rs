// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Generic utilities for Lua (`api.util`).
//!
//! Hashing, encoding, identifiers, redirects and a little host telemetry.
//! Lookups that depend on the network (`getIPAddress`, `dnsLookup`) never
//! raise: `dnsLookup` returns the error text in place of the address list.

use std::io;
use std::net::{IpAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{SecondsFormat, Utc};
use lazy_static::lazy_static;
use mlua::{IntoLuaMulti, Lua, Result as LuaResult};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rand::{distributions::Alphanumeric, Rng};
use regex::Regex;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use sysinfo::System;

use super::{api_table, recover};

lazy_static! {
    static ref EMAIL_PATTERN: Regex =
        Regex::new(r"^[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9-.]+$").expect("valid email regex");
}

/// Characters left as-is by `urlEncode`: unreserved characters and `/`.
const URL_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~')
    .remove(b'/');

/// Registers `api.util` on the given Lua instance.
pub fn register_util_module(lua: &Lua) -> LuaResult<()> {
    let util = lua.create_table()?;

    util.set(
        "sleep",
        lua.create_function(|_, seconds: f64| {
            if seconds.is_finite() && seconds > 0.0 {
                std::thread::sleep(Duration::from_secs_f64(seconds));
            }
            Ok(())
        })?,
    )?;

    util.set(
        "serveRedirect",
        lua.create_function(|lua, link: String| {
            let table = lua.create_table()?;
            table.set("_redirect", link)?;
            Ok(table)
        })?,
    )?;

    util.set(
        "hashData",
        lua.create_function(|_, (data, algorithm): (mlua::String, Option<String>)| {
            let algorithm = algorithm.unwrap_or_else(|| "sha256".to_string());
            Ok(hash_hex(&data.as_bytes(), &algorithm)
                .unwrap_or_else(|| format!("Unsupported hash algorithm: {}", algorithm)))
        })?,
    )?;

    util.set(
        "validateEmail",
        lua.create_function(|_, email: String| Ok(EMAIL_PATTERN.is_match(&email)))?,
    )?;

    util.set(
        "base64Encode",
        lua.create_function(|_, data: mlua::String| Ok(STANDARD.encode(&*data.as_bytes())))?,
    )?;

    util.set(
        "base64Decode",
        lua.create_function(|_, data: String| Ok(base64_decode_text(&data)))?,
    )?;

    util.set(
        "timestamp",
        lua.create_function(|_, ()| Ok(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)))?,
    )?;

    util.set(
        "uuid",
        lua.create_function(|_, ()| Ok(uuid::Uuid::new_v4().to_string()))?,
    )?;

    util.set(
        "urlEncode",
        lua.create_function(|_, data: String| Ok(url_encode(&data)))?,
    )?;

    util.set(
        "urlDecode",
        lua.create_function(|_, data: String| {
            Ok(percent_decode_str(&data).decode_utf8_lossy().into_owned())
        })?,
    )?;

    util.set(
        "generateRandomString",
        lua.create_function(|_, length: usize| Ok(random_string(length)))?,
    )?;

    util.set(
        "getIPAddress",
        lua.create_function(|lua, ()| recover(lua, local_ip().map(|ip| ip.to_string())))?,
    )?;

    util.set(
        "dnsLookup",
        lua.create_function(|lua, domain: String| match dns_lookup(&domain) {
            Ok(addresses) => lua.create_sequence_from(addresses)?.into_lua_multi(lua),
            Err(e) => e.to_string().into_lua_multi(lua),
        })?,
    )?;

    util.set(
        "generateSlug",
        lua.create_function(|_, text: String| Ok(slugify(&text)))?,
    )?;

    util.set(
        "getCpuUsage",
        lua.create_function(|_, ()| {
            let mut system = System::new();
            system.refresh_cpu_usage();
            std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
            system.refresh_cpu_usage();
            Ok(system.global_cpu_usage())
        })?,
    )?;

    util.set(
        "getMemoryUsage",
        lua.create_function(|_, ()| {
            let mut system = System::new();
            system.refresh_memory();
            Ok(system.used_memory() / 1024)
        })?,
    )?;

    api_table(lua)?.set("util", util)?;
    Ok(())
}

/// Hex digest of `data`, or `None` for an unknown algorithm.
fn hash_hex(data: &[u8], algorithm: &str) -> Option<String> {
    let digest = match algorithm.to_ascii_lowercase().as_str() {
        "sha224" => format!("{:x}", Sha224::digest(data)),
        "sha256" => format!("{:x}", Sha256::digest(data)),
        "sha384" => format!("{:x}", Sha384::digest(data)),
        "sha512" => format!("{:x}", Sha512::digest(data)),
        _ => return None,
    };
    Some(digest)
}

fn base64_decode_text(data: &str) -> String {
    STANDARD
        .decode(data.trim())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| "Invalid Base64 data".to_string())
}

fn url_encode(data: &str) -> String {
    utf8_percent_encode(data, URL_ENCODE_SET).to_string()
}

fn random_string(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

fn slugify(text: &str) -> String {
    url_encode(&text.to_lowercase().replace(' ', "-"))
}

/// Address of the interface used for outbound traffic.
///
/// Connecting a UDP socket only selects a route; nothing is sent.
fn local_ip() -> io::Result<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.connect("8.8.8.8:80")?;
    Ok(socket.local_addr()?.ip())
}

/// IPv4 addresses for `domain` from the platform resolver.
fn dns_lookup(domain: &str) -> io::Result<Vec<String>> {
    let mut addresses: Vec<String> = Vec::new();
    for addr in (domain, 0).to_socket_addrs()? {
        if let IpAddr::V4(v4) = addr.ip() {
            let text = v4.to_string();
            if !addresses.contains(&text) {
                addresses.push(text);
            }
        }
    }
    if addresses.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("The DNS response does not contain an A record for {}", domain),
        ));
    }
    Ok(addresses)
}
