// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT authentication tests.
//!
//! These tests verify that JWT tokens created by the auth routes can be
//! decoded with the claims layout the middleware expects.

use fitcoach::middleware::auth::{create_jwt, decode_jwt, JWT_LIFETIME_SECS};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

const KEY: &[u8] = b"test_jwt_key_32_bytes_minimum!!";

/// Claims structure that must match what the middleware expects.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: usize,
    iat: usize,
}

fn now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize
}

#[test]
fn test_created_jwt_has_expected_claims() {
    let account_id = Uuid::new_v4();
    let token = create_jwt(account_id, KEY).unwrap();

    let data = decode::<Claims>(
        &token,
        &DecodingKey::from_secret(KEY),
        &Validation::new(Algorithm::HS256),
    )
    .unwrap();

    assert_eq!(data.claims.sub, account_id.to_string());
    assert_eq!(data.claims.exp - data.claims.iat, JWT_LIFETIME_SECS);
}

#[test]
fn test_expired_jwt_rejected() {
    let claims = Claims {
        sub: Uuid::new_v4().to_string(),
        exp: now() - 3600,
        iat: now() - 7200,
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(KEY),
    )
    .unwrap();

    assert!(decode_jwt(&token, KEY).is_err());
}

#[test]
fn test_non_uuid_subject_rejected() {
    let claims = Claims {
        sub: "12345".to_string(),
        exp: now() + 3600,
        iat: now(),
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(KEY),
    )
    .unwrap();

    assert!(decode_jwt(&token, KEY).is_err());
}
