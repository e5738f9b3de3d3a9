//! Entity reader/writer registry.
//!
//! The engine only looks candidates up here; the codecs themselves are
//! opaque. A few defaults cover text, raw bytes and JSON.

use std::any::Any;
use std::fmt;
use std::io::Read;
use std::marker::PhantomData;
use std::sync::Arc;

use bytes::Bytes;
use mime::Mime;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::RestError;
use crate::media::{self, AcceptEntry, MatchScore};
use crate::value::{Entity, TypeKey};

/// Decodes a request body into a typed entity.
pub trait MessageBodyReader: Send + Sync {
    /// Reads the whole body.
    fn read(&self, body: &mut dyn Read, media_type: &Mime) -> Result<Entity, RestError>;
}

/// Encodes an entity into response bytes.
pub trait MessageBodyWriter: Send + Sync {
    /// Encodes the entity.
    fn write(&self, entity: Entity, media_type: &Mime) -> Result<Bytes, RestError>;
}

struct Registration<T: ?Sized> {
    type_key: TypeKey,
    media_types: Vec<Mime>,
    codec: Arc<T>,
}

impl<T: ?Sized> Registration<T> {
    /// Best specificity of a registered type compatible with `media`.
    fn fit(&self, media: &Mime) -> Option<u8> {
        self.media_types
            .iter()
            .filter(|m| media::is_compatible(m, media))
            .map(media::specificity)
            .max()
    }
}

/// The reader and writer registry.
#[derive(Default)]
pub struct Serialisers {
    readers: Vec<Registration<dyn MessageBodyReader>>,
    writers: Vec<Registration<dyn MessageBodyWriter>>,
}

impl fmt::Debug for Serialisers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Serialisers")
            .field("readers", &self.readers.len())
            .field("writers", &self.writers.len())
            .finish()
    }
}

impl Serialisers {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in codecs: `String` as `text/plain`,
    /// `Bytes` and `Vec<u8>` as `application/octet-stream`, and
    /// `serde_json::Value` as `application/json`.
    pub fn with_defaults() -> Self {
        let mut s = Self::new();
        s.add_reader(TypeKey::of::<String>(), vec![mime::TEXT_PLAIN, mime::STAR_STAR], TextCodec);
        s.add_writer(TypeKey::of::<String>(), vec![mime::TEXT_PLAIN, mime::STAR_STAR], TextCodec);
        s.add_writer(
            TypeKey::of::<&'static str>(),
            vec![mime::TEXT_PLAIN, mime::STAR_STAR],
            TextCodec,
        );
        s.add_reader(TypeKey::of::<Bytes>(), vec![mime::STAR_STAR], BytesCodec);
        s.add_writer(
            TypeKey::of::<Bytes>(),
            vec![mime::APPLICATION_OCTET_STREAM, mime::STAR_STAR],
            BytesCodec,
        );
        s.add_writer(
            TypeKey::of::<Vec<u8>>(),
            vec![mime::APPLICATION_OCTET_STREAM, mime::STAR_STAR],
            BytesCodec,
        );
        s.register_json::<serde_json::Value>();
        s
    }

    /// Registers a reader for entities of `type_key`.
    pub fn add_reader(
        &mut self,
        type_key: TypeKey,
        media_types: Vec<Mime>,
        reader: impl MessageBodyReader + 'static,
    ) {
        self.readers.push(Registration {
            type_key,
            media_types,
            codec: Arc::new(reader),
        });
    }

    /// Registers a writer for entities of `type_key`.
    pub fn add_writer(
        &mut self,
        type_key: TypeKey,
        media_types: Vec<Mime>,
        writer: impl MessageBodyWriter + 'static,
    ) {
        self.writers.push(Registration {
            type_key,
            media_types,
            codec: Arc::new(writer),
        });
    }

    /// Registers JSON reading and writing for `T`.
    pub fn register_json<T>(&mut self)
    where
        T: Serialize + DeserializeOwned + Send + 'static,
    {
        self.add_reader(
            TypeKey::of::<T>(),
            vec![mime::APPLICATION_JSON],
            JsonCodec::<T>::new(),
        );
        self.add_writer(
            TypeKey::of::<T>(),
            vec![mime::APPLICATION_JSON],
            JsonCodec::<T>::new(),
        );
    }

    /// Readers able to produce `type_key` from `media_type`, most specific
    /// registration first, then registration order.
    pub fn find_readers(
        &self,
        type_key: TypeKey,
        media_type: &Mime,
    ) -> Vec<Arc<dyn MessageBodyReader>> {
        Self::find(&self.readers, type_key, media_type)
    }

    /// Writers able to encode `type_key` as `media_type`, most specific
    /// registration first, then registration order.
    pub fn find_writers(
        &self,
        type_key: TypeKey,
        media_type: &Mime,
    ) -> Vec<Arc<dyn MessageBodyWriter>> {
        Self::find(&self.writers, type_key, media_type)
    }

    fn find<T: ?Sized>(
        registrations: &[Registration<T>],
        type_key: TypeKey,
        media_type: &Mime,
    ) -> Vec<Arc<T>> {
        let mut found: Vec<(u8, usize, Arc<T>)> = registrations
            .iter()
            .enumerate()
            .filter(|(_, r)| r.type_key == type_key)
            .filter_map(|(i, r)| r.fit(media_type).map(|fit| (fit, i, r.codec.clone())))
            .collect();
        found.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        found.into_iter().map(|(_, _, codec)| codec).collect()
    }

    /// Chooses a media type and writer for an entity when the resource
    /// declared none, negotiating `accept` against what the writers for the
    /// entity's type can produce.
    ///
    /// A wildcard outcome is written as `application/octet-stream`.
    pub fn find_writer_no_media_type(
        &self,
        accept: &[AcceptEntry],
        entity: &Entity,
    ) -> Option<(Mime, Arc<dyn MessageBodyWriter>)> {
        let key = entity.type_key();
        let mut best: Option<(MatchScore, Mime, Arc<dyn MessageBodyWriter>)> = None;

        for registration in self.writers.iter().filter(|r| r.type_key == key) {
            for produced in &registration.media_types {
                let candidates = std::slice::from_ref(produced);
                let (Some(score), Some(media)) = (
                    media::best_score(accept, candidates),
                    media::negotiate(accept, candidates),
                ) else {
                    continue;
                };
                if best.as_ref().map_or(true, |(current, _, _)| score > *current) {
                    best = Some((score, media, registration.codec.clone()));
                }
            }
        }

        best.map(|(_, media, writer)| {
            let media = if media::is_wildcard(&media) {
                mime::APPLICATION_OCTET_STREAM
            } else {
                media
            };
            (media, writer)
        })
    }
}

/// `String` (and `&'static str`) as UTF-8 text.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCodec;

impl MessageBodyReader for TextCodec {
    fn read(&self, body: &mut dyn Read, _media_type: &Mime) -> Result<Entity, RestError> {
        let mut text = String::new();
        body.read_to_string(&mut text)
            .map_err(|e| RestError::deserialization("body is not valid UTF-8 text", e))?;
        Ok(Entity::new(text))
    }
}

impl MessageBodyWriter for TextCodec {
    fn write(&self, entity: Entity, _media_type: &Mime) -> Result<Bytes, RestError> {
        let entity = match entity.downcast::<String>() {
            Ok(text) => return Ok(Bytes::from(text)),
            Err(entity) => entity,
        };
        match entity.downcast::<&'static str>() {
            Ok(text) => Ok(Bytes::from_static(text.as_bytes())),
            Err(entity) => Err(mismatch(&entity, "text")),
        }
    }
}

/// `Bytes` and `Vec<u8>` passed through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesCodec;

impl MessageBodyReader for BytesCodec {
    fn read(&self, body: &mut dyn Read, _media_type: &Mime) -> Result<Entity, RestError> {
        let mut buf = Vec::new();
        body.read_to_end(&mut buf)
            .map_err(|e| RestError::deserialization("failed to read body", e))?;
        Ok(Entity::new(Bytes::from(buf)))
    }
}

impl MessageBodyWriter for BytesCodec {
    fn write(&self, entity: Entity, _media_type: &Mime) -> Result<Bytes, RestError> {
        let entity = match entity.downcast::<Bytes>() {
            Ok(bytes) => return Ok(bytes),
            Err(entity) => entity,
        };
        match entity.downcast::<Vec<u8>>() {
            Ok(bytes) => Ok(Bytes::from(bytes)),
            Err(entity) => Err(mismatch(&entity, "bytes")),
        }
    }
}

/// JSON via `serde_json` for one concrete type.
pub struct JsonCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    /// Creates the codec.
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> MessageBodyReader for JsonCodec<T>
where
    T: DeserializeOwned + Send + 'static,
{
    fn read(&self, body: &mut dyn Read, _media_type: &Mime) -> Result<Entity, RestError> {
        let value: T = serde_json::from_reader(body).map_err(|e| {
            RestError::deserialization(
                format!("invalid JSON for {}", std::any::type_name::<T>()),
                e,
            )
        })?;
        Ok(Entity::new(value))
    }
}

impl<T> MessageBodyWriter for JsonCodec<T>
where
    T: Serialize + Any + Send,
{
    fn write(&self, entity: Entity, _media_type: &Mime) -> Result<Bytes, RestError> {
        let value = entity.downcast::<T>().map_err(|e| mismatch(&e, "JSON"))?;
        serde_json::to_vec(&value)
            .map(Bytes::from)
            .map_err(|e| RestError::serialization("failed to encode JSON", e))
    }
}

fn mismatch(entity: &Entity, codec: &str) -> RestError {
    RestError::internal(format!(
        "{codec} writer cannot encode {}",
        entity.type_name()
    ))
}
