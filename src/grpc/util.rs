use tonic::metadata::{Ascii, KeyAndValueRef, MetadataKey, MetadataMap, MetadataValue};

pub fn log_metadata(direction: &'static str, metadata: &MetadataMap) {
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return;
    }
    metadata_for_each(metadata, |key, value| {
        tracing::debug!(direction, key = key.as_str(), ?value, "metadata")
    });
}

fn metadata_for_each<F>(metadata: &MetadataMap, mut f: F)
where
    F: FnMut(&MetadataKey<Ascii>, &MetadataValue<Ascii>),
{
    for key_and_value in metadata.iter() {
        match key_and_value {
            KeyAndValueRef::Ascii(key, value) => f(key, value),
            KeyAndValueRef::Binary(key, _value) => {
                tracing::trace!(key = key.as_str(), "skipping binary metadata")
            }
        }
    }
}
