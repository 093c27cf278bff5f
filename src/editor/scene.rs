use crate::geometry::{Offset, Point, Rect};

use super::DrawingElement;

/// Selection plus the ordered annotation list of one overlay session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    selection: Option<Rect>,
    elements: Vec<DrawingElement>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> Option<Rect> {
        self.selection
    }

    pub fn set_selection(&mut self, selection: Option<Rect>) {
        self.selection = selection;
    }

    pub fn elements(&self) -> &[DrawingElement] {
        &self.elements
    }

    pub fn element(&self, index: usize) -> Option<&DrawingElement> {
        self.elements.get(index)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn push(&mut self, element: DrawingElement) -> usize {
        self.elements.push(element);
        self.elements.len() - 1
    }

    pub fn remove_at(&mut self, index: usize) -> Option<DrawingElement> {
        (index < self.elements.len()).then(|| self.elements.remove(index))
    }

    /// Index past the end appends.
    pub fn insert_at(&mut self, index: usize, element: DrawingElement) -> usize {
        let index = index.min(self.elements.len());
        self.elements.insert(index, element);
        index
    }

    pub fn replace_at(&mut self, index: usize, element: DrawingElement) -> bool {
        match self.elements.get_mut(index) {
            Some(slot) => {
                *slot = element;
                true
            }
            None => false,
        }
    }

    /// Removes the most recently appended element; no-op when empty.
    pub fn undo_last(&mut self) -> Option<DrawingElement> {
        self.elements.pop()
    }

    /// Topmost (last drawn) element under `point`.
    pub fn topmost_at(&self, point: Point, tolerance: f64) -> Option<usize> {
        self.elements
            .iter()
            .rposition(|element| element.hit_test(point, tolerance))
    }

    pub fn topmost_text_at(&self, point: Point) -> Option<usize> {
        self.elements
            .iter()
            .rposition(|element| element.is_text() && element.hit_test(point, 0.0))
    }

    /// Moves the selection and every element by the same delta.
    pub fn translate_all(&mut self, delta: Offset) {
        if delta.is_zero() {
            return;
        }
        if let Some(selection) = self.selection.as_mut() {
            *selection = selection.translated(delta);
        }
        for element in &mut self.elements {
            *element = element.translated(delta);
        }
    }

    pub fn translate_element(&mut self, index: usize, delta: Offset) -> bool {
        match self.elements.get(index) {
            Some(element) => {
                let moved = element.translated(delta);
                self.replace_at(index, moved)
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.selection = None;
        self.elements.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::{ElementShape, ElementStyle};

    fn rectangle(x: f64) -> DrawingElement {
        DrawingElement::new(
            ElementShape::Rectangle {
                rect: Rect::new(x, 0.0, 10.0, 10.0),
            },
            ElementStyle::default(),
        )
    }

    #[test]
    fn undo_removes_only_the_last_element_and_is_noop_when_empty() {
        let mut scene = Scene::new();
        scene.push(rectangle(0.0));
        scene.push(rectangle(20.0));

        assert_eq!(scene.undo_last(), Some(rectangle(20.0)));
        assert_eq!(scene.elements(), &[rectangle(0.0)]);
        assert_eq!(scene.undo_last(), Some(rectangle(0.0)));
        assert_eq!(scene.undo_last(), None);
        assert!(scene.is_empty());
    }

    #[test]
    fn topmost_at_prefers_later_elements() {
        let mut scene = Scene::new();
        scene.push(rectangle(0.0));
        scene.push(rectangle(5.0));
        assert_eq!(scene.topmost_at(Point::new(5.0, 5.0), 1.0), Some(1));
        assert_eq!(scene.topmost_at(Point::new(0.0, 5.0), 1.0), Some(0));
        assert_eq!(scene.topmost_at(Point::new(50.0, 50.0), 1.0), None);
    }

    #[test]
    fn insert_at_restores_original_position() {
        let mut scene = Scene::new();
        scene.push(rectangle(0.0));
        scene.push(rectangle(20.0));
        scene.push(rectangle(40.0));

        let removed = scene.remove_at(1).expect("middle element should exist");
        assert_eq!(scene.len(), 2);
        assert_eq!(scene.insert_at(1, removed), 1);
        assert_eq!(
            scene.elements(),
            &[rectangle(0.0), rectangle(20.0), rectangle(40.0)]
        );
        assert_eq!(scene.insert_at(99, rectangle(60.0)), 3);
        assert_eq!(scene.remove_at(99), None);
    }

    #[test]
    fn translate_all_moves_selection_and_elements_together() {
        let mut scene = Scene::new();
        scene.set_selection(Some(Rect::new(0.0, 0.0, 100.0, 100.0)));
        scene.push(rectangle(10.0));

        scene.translate_all(Offset::new(5.0, -3.0));
        assert_eq!(scene.selection(), Some(Rect::new(5.0, -3.0, 100.0, 100.0)));
        assert_eq!(
            scene.elements()[0].bounding_rect(),
            Rect::new(15.0, -3.0, 10.0, 10.0)
        );

        scene.translate_all(Offset::new(-5.0, 3.0));
        assert_eq!(scene.selection(), Some(Rect::new(0.0, 0.0, 100.0, 100.0)));
        assert_eq!(scene.elements()[0], rectangle(10.0));
    }
}
