use assert_cmd::Command;
use predicates::prelude::*;

const BCRYPT_HASH: &str = "$2a$05$bvIG6Nmid91Mu9RcmmWZfO5HJIMCT8riNW0hEp8f6/FuA2/mHZFpe";
const NT_HASH: &str = "$3$$8846f7eaee8fb117ad06bdd830b7586c";

fn bin() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("pwcrypt"))
}

fn hash_with(scheme: &str, rounds: &str, password: &str) -> String {
    let output = bin()
        .env("PWCRYPT_PASSWORD", password)
        .arg("hash")
        .arg("--scheme")
        .arg(scheme)
        .arg("--rounds")
        .arg(rounds)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    String::from_utf8(output).unwrap().trim_end().to_string()
}

#[test]
fn hash_then_verify_roundtrip() {
    let hash = hash_with("bcrypt", "4", "pw");
    assert!(hash.starts_with("$2a$04$"));

    bin()
        .env("PWCRYPT_PASSWORD", "pw")
        .arg("verify")
        .arg(&hash)
        .assert()
        .success()
        .stdout(predicate::str::contains("password matches"));
}

#[test]
fn verify_wrong_password_fails() {
    bin()
        .env("PWCRYPT_PASSWORD", "wrong")
        .arg("verify")
        .arg(BCRYPT_HASH)
        .assert()
        .failure()
        .stderr(predicate::str::contains("password does not match"));
}

#[test]
fn verify_reads_password_from_stdin() {
    bin()
        .env_remove("PWCRYPT_PASSWORD")
        .arg("verify")
        .arg(NT_HASH)
        .write_stdin("password\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("password matches"));
}

#[test]
fn verify_with_explicit_scheme() {
    bin()
        .env("PWCRYPT_PASSWORD", "password")
        .arg("verify")
        .arg("--scheme")
        .arg("bsdi-crypt")
        .arg("_Gl/.K0Ay.aosctsbJ1k")
        .assert()
        .success();
}

#[test]
fn hash_each_scheme() {
    for scheme in ["pbkdf2-sha1", "pbkdf2-sha256", "pbkdf2-sha512", "grub-pbkdf2-sha512", "bsdi-crypt"] {
        let hash = hash_with(scheme, "3", "open sesame");
        bin()
            .env("PWCRYPT_PASSWORD", "open sesame")
            .arg("verify")
            .arg("--scheme")
            .arg(scheme)
            .arg(&hash)
            .assert()
            .success();
    }

    let des = hash_with("des-crypt", "fast", "pw");
    assert_eq!(des.len(), 13);
    assert_eq!(hash_with("nthash", "slow", "password"), NT_HASH);
}

#[test]
fn unknown_alias_warns_and_uses_medium() {
    bin()
        .env("PWCRYPT_PASSWORD", "pw")
        .arg("hash")
        .arg("--scheme")
        .arg("bsdi-crypt")
        .arg("--rounds")
        .arg("turbo")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("_Gl/."))
        .stderr(predicate::str::contains("unknown cost alias"));
}

#[test]
fn scheme_from_environment() {
    bin()
        .env("PWCRYPT_PASSWORD", "pw")
        .env("PWCRYPT_SCHEME", "pbkdf2-sha256")
        .env("PWCRYPT_ROUNDS", "10")
        .arg("hash")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("$pbkdf2-sha256$10$"));
}

#[test]
fn identify_names_matching_schemes() {
    bin()
        .arg("identify")
        .arg(BCRYPT_HASH)
        .assert()
        .success()
        .stdout(predicate::str::diff("bcrypt\n"));

    bin()
        .arg("identify")
        .arg("definitely not a hash")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized hash format"));
}

#[test]
fn inspect_prints_json() {
    let output = bin()
        .arg("inspect")
        .arg("_Gl/.K0Ay.aosctsbJ1k")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["scheme"], "bsdi-crypt");
    assert_eq!(json["rounds"], 7250);
    assert_eq!(json["salt"].as_str().unwrap().len(), 6);
    assert_eq!(json["checksum"].as_str().unwrap().len(), 16);
}

#[test]
fn inspect_rejects_malformed_hash() {
    bin()
        .arg("inspect")
        .arg("--scheme")
        .arg("bcrypt")
        .arg("$2a$99$bvIG6Nmid91Mu9RcmmWZfO")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid format"));
}

#[test]
fn schemes_lists_everything() {
    bin()
        .arg("schemes")
        .assert()
        .success()
        .stdout(predicate::str::contains("bcrypt"))
        .stdout(predicate::str::contains("grub-pbkdf2-sha512"))
        .stdout(predicate::str::contains("nthash"));
}
