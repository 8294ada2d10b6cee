use tracing::{debug, trace};

use super::{DecodeContext, UnresolvedPolicy};
use crate::cursor::{NodeKind, TreeCursor};
use crate::objects::{ObjectHandle, ObjectKind};
use crate::types::error::{EwsError, Result};

/// Drives the field decoding of polymorphic objects
///
/// The materializer owns the child loop: the concrete type only sees one
/// child element at a time, and unknown children are skipped here.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectMaterializer {
    expected: Option<ObjectKind>,
}

impl ObjectMaterializer {
    /// Materializer resolving any registered type
    pub fn new() -> Self {
        Self::default()
    }

    /// Materializer resolving only types of one family
    pub fn expecting(kind: ObjectKind) -> Self {
        Self {
            expected: Some(kind),
        }
    }

    /// Materialize the element the cursor is positioned on
    ///
    /// Returns `None` when the discriminator is unknown, leaving the cursor
    /// on the unresolved element-start. Otherwise the cursor ends on the
    /// element's matching element-end.
    pub fn materialize(
        &self,
        cursor: &mut dyn TreeCursor,
        ctx: &DecodeContext,
    ) -> Result<Option<ObjectHandle>> {
        let discriminator = match cursor.discriminator() {
            Some(discriminator) => discriminator.to_string(),
            None => {
                return Err(EwsError::UnexpectedNode(format!(
                    "object element expected, found {}",
                    cursor.describe()
                )))
            }
        };

        let mut object = match ctx.registry.create(&discriminator, self.expected) {
            Some(object) => object,
            None => {
                debug!(
                    "Unresolved discriminator {} (expected kind {:?})",
                    discriminator, self.expected
                );
                return Ok(None);
            }
        };

        let name = cursor.local_name().to_string();
        let namespace = cursor.namespace();
        let depth = cursor.depth();
        object.decode_attributes(&*cursor)?;

        while cursor.next_child(depth)? {
            let field = cursor.local_name().to_string();
            if object.decode_field(cursor, ctx)? {
                // a recognized field must be consumed up to its own end
                let balanced = cursor.node_kind() == NodeKind::End
                    && cursor.depth() == depth + 1
                    && cursor.local_name() == field;
                if !balanced {
                    return Err(EwsError::desync(format!("</{field}>"), cursor.describe()));
                }
            } else {
                if !cursor.is_start() || cursor.depth() != depth + 1 {
                    return Err(EwsError::desync(format!("<{field}>"), cursor.describe()));
                }
                trace!("Skipping unknown field {} of {}", field, discriminator);
                cursor.skip_subtree()?;
            }
        }

        cursor.ensure_end_of(namespace, &name)?;
        Ok(Some(object))
    }

    /// Materialize an object that must be of a known type
    pub fn materialize_required(
        &self,
        cursor: &mut dyn TreeCursor,
        ctx: &DecodeContext,
    ) -> Result<ObjectHandle> {
        match self.materialize(cursor, ctx)? {
            Some(object) => Ok(object),
            None => Err(unresolved(cursor)),
        }
    }

    /// Materialize with an explicit policy for unknown types
    ///
    /// With `Skip`, an unknown element is skipped and `None` returned, the
    /// cursor left on its element-end.
    pub fn materialize_with_policy(
        &self,
        cursor: &mut dyn TreeCursor,
        ctx: &DecodeContext,
        policy: UnresolvedPolicy,
    ) -> Result<Option<ObjectHandle>> {
        match self.materialize(cursor, ctx)? {
            Some(object) => Ok(Some(object)),
            None => match policy {
                UnresolvedPolicy::Skip => {
                    cursor.skip_subtree()?;
                    Ok(None)
                }
                UnresolvedPolicy::Fail => Err(unresolved(cursor)),
            },
        }
    }

    /// Materialize every child of the collection element the cursor is
    /// positioned on, in document order
    pub fn materialize_collection(
        &self,
        cursor: &mut dyn TreeCursor,
        ctx: &DecodeContext,
        policy: UnresolvedPolicy,
    ) -> Result<Vec<ObjectHandle>> {
        let depth = cursor.depth();
        let mut objects = Vec::new();
        while cursor.next_child(depth)? {
            if let Some(object) = self.materialize_with_policy(cursor, ctx, policy)? {
                objects.push(object);
            }
        }
        Ok(objects)
    }
}

fn unresolved(cursor: &dyn TreeCursor) -> EwsError {
    EwsError::UnresolvedDiscriminator(cursor.discriminator().unwrap_or_default().to_string())
}
