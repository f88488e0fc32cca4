//! Archive export over the durable mirror.
//!
//! Exercises the full privileged path the way an operator would: keys
//! escrowed into a Redb mirror as the client rotates, then an export
//! window decrypted after a process restart.

use tempfile::tempdir;
use vaultwire_archive::{
    ArchiveError, ArchiveRecoveryService, DateRange, ExportedMessage, MemoryMessageArchive,
    RedbKeyStore, StoredMessage,
};
use vaultwire_crypto::{KdfAlgorithm, derive_conversation_key};

const OPERATOR_SALT: [u8; 16] = [0x0Fu8; 16];
const PASSWORD: &str = "operator passphrase";

fn message(key: &[u8; 32], id: &str, sent_at_secs: u64, plaintext: &str) -> StoredMessage {
    StoredMessage {
        message_id: id.to_string(),
        sent_at_secs,
        payload: vaultwire_crypto::encrypt(key, plaintext.as_bytes()),
    }
}

#[tokio::test]
async fn escrowed_keys_survive_restart_and_export() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("mirror.redb");

    // The conversation key as the client pipeline would derive it
    let key = derive_conversation_key(b"pipeline shared secret", "conv-1", 1);

    // Escrow in one process lifetime
    {
        let mirror = RedbKeyStore::open(&path).unwrap();
        let service = ArchiveRecoveryService::with_algorithm(
            mirror,
            MemoryMessageArchive::new(),
            OPERATOR_SALT,
            KdfAlgorithm::Pbkdf2Sha256,
        );
        service.escrow_key("conv-1", &key, 1, PASSWORD).await.unwrap();
    }

    // Export in another
    let mirror = RedbKeyStore::open(&path).unwrap();
    let archive = MemoryMessageArchive::new();
    archive.push_message("conv-1", message(&key, "m1", 100, "minutes of the meeting"));
    archive.push_message("conv-1", message(&key, "m2", 200, "follow-up"));

    let service = ArchiveRecoveryService::with_algorithm(
        mirror,
        archive,
        OPERATOR_SALT,
        KdfAlgorithm::Pbkdf2Sha256,
    );

    let report = service
        .export_decrypted("conv-1", DateRange { from_secs: 0, to_secs: u64::MAX }, PASSWORD)
        .await
        .unwrap();

    assert_eq!(report.decrypted_count, 2);
    assert_eq!(report.failed_count, 0);
    assert!(matches!(
        &report.messages[0],
        ExportedMessage::Decrypted { plaintext, .. } if plaintext == "minutes of the meeting"
    ));
}

#[tokio::test]
async fn rotation_era_messages_flag_without_aborting() {
    let dir = tempdir().unwrap();
    let mirror = RedbKeyStore::open(dir.path().join("mirror.redb")).unwrap();

    let key_v1 = derive_conversation_key(b"secret v1", "conv-1", 1);
    let key_v2 = derive_conversation_key(b"secret v2", "conv-1", 2);

    let archive = MemoryMessageArchive::new();
    // Messages straddle a rotation; the mirror only holds the latest key
    archive.push_message("conv-1", message(&key_v1, "m1", 100, "pre-rotation"));
    archive.push_message("conv-1", message(&key_v2, "m2", 200, "post-rotation"));

    let service = ArchiveRecoveryService::with_algorithm(
        mirror,
        archive,
        OPERATOR_SALT,
        KdfAlgorithm::Pbkdf2Sha256,
    );
    service.escrow_key("conv-1", &key_v2, 2, PASSWORD).await.unwrap();

    let report = service
        .export_decrypted("conv-1", DateRange { from_secs: 0, to_secs: u64::MAX }, PASSWORD)
        .await
        .unwrap();

    assert_eq!(report.key_version, 2);
    assert_eq!(report.decrypted_count, 1);
    assert_eq!(report.failed_count, 1);

    // The flagged message still carries its ciphertext
    match &report.messages[0] {
        ExportedMessage::Failed { message_id, payload, .. } => {
            assert_eq!(message_id, "m1");
            assert_eq!(vaultwire_crypto::decrypt(&key_v1, payload).unwrap(), b"pre-rotation");
        },
        other => unreachable!("expected flagged pre-rotation message, got {other:?}"),
    }
}

#[tokio::test]
async fn wrong_password_is_an_export_level_failure() {
    let dir = tempdir().unwrap();
    let mirror = RedbKeyStore::open(dir.path().join("mirror.redb")).unwrap();

    let key = derive_conversation_key(b"secret", "conv-1", 1);
    let service = ArchiveRecoveryService::with_algorithm(
        mirror,
        MemoryMessageArchive::new(),
        OPERATOR_SALT,
        KdfAlgorithm::Pbkdf2Sha256,
    );
    service.escrow_key("conv-1", &key, 1, PASSWORD).await.unwrap();

    let result = service
        .export_decrypted("conv-1", DateRange { from_secs: 0, to_secs: u64::MAX }, "nope")
        .await;

    assert_eq!(result, Err(ArchiveError::AuthenticationFailure));
}

#[tokio::test]
async fn report_serializes_for_the_cli_boundary() {
    let dir = tempdir().unwrap();
    let mirror = RedbKeyStore::open(dir.path().join("mirror.redb")).unwrap();

    let key = derive_conversation_key(b"secret", "conv-1", 1);
    let archive = MemoryMessageArchive::new();
    archive.push_message("conv-1", message(&key, "m1", 100, "hello"));

    let service = ArchiveRecoveryService::with_algorithm(
        mirror,
        archive,
        OPERATOR_SALT,
        KdfAlgorithm::Pbkdf2Sha256,
    );
    service.escrow_key("conv-1", &key, 1, PASSWORD).await.unwrap();

    let report = service
        .export_decrypted("conv-1", DateRange { from_secs: 0, to_secs: u64::MAX }, PASSWORD)
        .await
        .unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["conversation_id"], "conv-1");
    assert_eq!(json["messages"][0]["status"], "decrypted");
    assert_eq!(json["messages"][0]["plaintext"], "hello");
}
