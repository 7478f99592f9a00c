//! s3relay-presign - print a presigned GET URL for an object.
//!
//! ```text
//! s3relay-presign minio.example.com:9000 AKID SECRET photos cats/tom.jpg --version 4
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use s3relay_auth::{ObjectPath, PresignRequest, SignatureVersion, presign};
use s3relay_core::{CredentialPair, OriginEndpoint};

#[derive(Debug, Parser)]
#[command(name = "s3relay-presign")]
#[command(about = "Generate MinIO/S3 presigned URLs")]
struct Cli {
    /// MinIO/S3 endpoint (e.g. minio.example.com:9000); https:// is assumed without a scheme
    endpoint: String,

    /// Access key
    access_key: String,

    /// Secret key
    secret_key: String,

    /// Bucket name
    bucket: String,

    /// Object key/path
    object_key: String,

    /// Expiration time in seconds
    #[arg(short, long, default_value_t = 3600)]
    expires: u64,

    /// Signature version (2 or 4)
    #[arg(short = 'v', long = "version", default_value = "2")]
    signature_version: SignatureVersion,

    /// AWS region for v4
    #[arg(short, long, default_value = "us-east-1")]
    region: String,
}

fn presigned_url(cli: &Cli, now: DateTime<Utc>) -> Result<String> {
    let endpoint = OriginEndpoint::parse(&cli.endpoint)
        .with_context(|| format!("invalid endpoint: {}", cli.endpoint))?;
    let credentials = CredentialPair::new(&cli.access_key, &cli.secret_key);
    let object = ObjectPath::new(&cli.bucket, &cli.object_key);

    let request = PresignRequest {
        method: "GET",
        endpoint: &endpoint,
        credentials: &credentials,
        object: &object,
        expires_in: cli.expires,
        region: &cli.region,
    };
    Ok(presign(cli.signature_version, &request, now).to_string())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    println!("{}", presigned_url(&cli, Utc::now())?);
    Ok(())
}
