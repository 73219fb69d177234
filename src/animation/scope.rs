use crate::source::{ObjectKey, SourceScene};

/// Exclusive access to the scene's evaluation state while baking.
///
/// Acquiring the scope records the current frame and un-hides the animated
/// objects so they evaluate; dropping it restores both, on success as well
/// as on early return with an error.
pub struct EvaluationScope<'a> {
    scene: &'a mut SourceScene,
    saved_frame: f32,
    saved_visibility: Vec<(ObjectKey, bool)>,
}

impl<'a> EvaluationScope<'a> {
    pub fn acquire(scene: &'a mut SourceScene, animated: impl IntoIterator<Item = ObjectKey>) -> Self {
        let saved_frame = scene.frame();
        let mut saved_visibility = Vec::new();
        for key in animated {
            if saved_visibility.iter().any(|&(k, _)| k == key) {
                continue;
            }
            if let Some(obj) = scene.object_mut(key) {
                saved_visibility.push((key, obj.hide_viewport));
                obj.hide_viewport = false;
            }
        }
        log::debug!(
            "Evaluation scope acquired at frame {saved_frame} for {} objects",
            saved_visibility.len()
        );
        Self {
            scene,
            saved_frame,
            saved_visibility,
        }
    }

    pub fn set_frame(&mut self, frame: f32) {
        self.scene.set_frame(frame);
    }

    #[must_use]
    pub fn scene(&self) -> &SourceScene {
        self.scene
    }
}

impl Drop for EvaluationScope<'_> {
    fn drop(&mut self) {
        for &(key, hidden) in &self.saved_visibility {
            if let Some(obj) = self.scene.object_mut(key) {
                obj.hide_viewport = hidden;
            }
        }
        self.scene.set_frame(self.saved_frame);
        log::debug!("Evaluation scope released, frame restored to {}", self.saved_frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ObjectKind;

    #[test]
    fn restores_frame_and_visibility() {
        let mut scene = SourceScene::new();
        let master = scene.master_collection();
        let cube = scene.add_object(master, "Cube", ObjectKind::Mesh);
        scene.object_mut(cube).unwrap().hide_viewport = true;
        scene.set_frame(7.0);

        {
            let mut scope = EvaluationScope::acquire(&mut scene, [cube]);
            assert!(!scope.scene().object(cube).unwrap().hide_viewport);
            scope.set_frame(42.0);
            assert_eq!(scope.scene().frame(), 42.0);
        }

        assert_eq!(scene.frame(), 7.0);
        assert!(scene.object(cube).unwrap().hide_viewport);
    }
}
